//! Ordered-rule classifier used when no model answer is available.
//!
//! Every pass walks its rule list top to bottom and the first rule whose
//! predicate holds decides the outcome. The last rule of each list always
//! matches, so classification is total.

use crate::results::HeuristicAnalysis;
use crate::snapshot::PageSnapshot;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Lower-cased text the rules look at
#[derive(Debug, Clone, Default)]
pub struct Signals {
    pub url: String,
    pub host: String,
    pub title: String,
    pub content: String,
    /// DOM issues plus warn/error console output
    pub issues: String,
}

impl Signals {
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        let mut issues: Vec<String> = snapshot.dom_issues.iter().map(|i| i.to_lowercase()).collect();
        issues.extend(snapshot.problem_entries().map(|e| e.message().to_lowercase()));
        if let Some(perf) = &snapshot.performance_snapshot {
            issues.extend(
                perf.network_failures
                    .iter()
                    .map(|f| format!("network failure {} {}", f.status.unwrap_or(0), f.name).to_lowercase()),
            );
        }

        let host = Url::parse(&snapshot.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_default();

        Self {
            url: snapshot.url.to_lowercase(),
            host,
            title: snapshot.title.to_lowercase(),
            content: snapshot.content_excerpt.to_lowercase(),
            issues: issues.join("\n"),
        }
    }

    fn any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| {
            self.title.contains(n) || self.content.contains(n) || self.issues.contains(n)
        })
    }

    fn issues_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.issues.contains(n))
    }

    fn host_is(&self, domain: &str) -> bool {
        self.host == domain || self.host.ends_with(&format!(".{}", domain))
    }
}

/// Titles that lead with a status code, e.g. "500 Internal Server Error" or "Error 404"
static TITLE_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\W*(?:(?:http\s+)?error\s*)?([45]\d{2})\b").expect("title status pattern is valid")
});

static TEXT_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b([45]\d{2})\s*[:\-–]?\s*(?:bad request|unauthorized|forbidden|not found|method not allowed|request timeout|too many requests|internal server error|not implemented|bad gateway|service unavailable|gateway time-?out)\b",
    )
    .expect("text status pattern is valid")
});

/// HTTP status code signalled by the page, title first
pub fn http_status(signals: &Signals) -> Option<u16> {
    TITLE_STATUS
        .captures(&signals.title)
        .or_else(|| TEXT_STATUS.captures(&signals.title))
        .or_else(|| TEXT_STATUS.captures(&signals.content))
        .or_else(|| TEXT_STATUS.captures(&signals.issues))
        .and_then(|caps| caps[1].parse().ok())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        400..=499 => "Client Error",
        _ => "Server Error",
    }
}

/// One header rule
pub struct HeaderRule {
    pub name: &'static str,
    pub matches: fn(&Signals) -> bool,
    pub header: fn(&Signals) -> String,
}

/// One severity or context rule with its fixed confidence
pub struct LabelRule {
    pub name: &'static str,
    pub matches: fn(&Signals) -> bool,
    pub label: &'static str,
    pub confidence: u8,
}

const AUTH_TERMS: [&str; 8] = [
    "unauthorized",
    "authentication required",
    "please log in",
    "please sign in",
    "session expired",
    "session has expired",
    "access denied",
    "invalid credentials",
];

const NETWORK_TERMS: [&str; 8] = [
    "failed to fetch",
    "networkerror",
    "network error",
    "net::err_",
    "err_connection",
    "cors policy",
    "request timed out",
    "load failed",
];

const VALIDATION_TERMS: [&str; 6] = [
    "validation",
    "is required",
    "required field",
    "invalid field",
    "invalid email",
    "please enter",
];

fn always(_: &Signals) -> bool {
    true
}

fn has_http_status(s: &Signals) -> bool {
    http_status(s).is_some()
}

fn has_auth_signal(s: &Signals) -> bool {
    s.any(&AUTH_TERMS) || s.url.contains("/login") || s.url.contains("/signin")
}

fn has_type_error(s: &Signals) -> bool {
    s.issues.contains("typeerror")
}

fn has_reference_error(s: &Signals) -> bool {
    s.issues.contains("referenceerror")
}

fn has_network_error(s: &Signals) -> bool {
    s.any(&NETWORK_TERMS) || s.issues.contains("network failure")
}

fn has_validation_error(s: &Signals) -> bool {
    s.any(&VALIDATION_TERMS)
}

fn known_service(s: &Signals) -> Option<&'static str> {
    const SERVICES: [(&str, &str); 5] = [
        ("github.com", "GitHub"),
        ("gitlab.com", "GitLab"),
        ("atlassian.net", "Jira"),
        ("stackoverflow.com", "Stack Overflow"),
        ("google.com", "Google"),
    ];

    if s.host == "localhost" || s.host == "127.0.0.1" {
        return Some("Local Development Server");
    }
    SERVICES
        .iter()
        .find(|(domain, _)| s.host_is(domain))
        .map(|(_, name)| *name)
}

fn is_known_service(s: &Signals) -> bool {
    known_service(s).is_some()
}

fn is_local(s: &Signals) -> bool {
    s.host == "localhost" || s.host == "127.0.0.1" || s.host.ends_with(".local")
}

fn is_server_error(s: &Signals) -> bool {
    matches!(http_status(s), Some(500..=599))
}

fn has_fatal_terms(s: &Signals) -> bool {
    s.issues_any(&["uncaught", "fatal", "crash", "unhandled rejection", "out of memory"])
}

fn has_js_error(s: &Signals) -> bool {
    has_type_error(s) || has_reference_error(s) || s.issues_any(&["syntaxerror", "rangeerror"])
}

fn has_any_issue(s: &Signals) -> bool {
    !s.issues.is_empty()
}

fn has_minor_terms(s: &Signals) -> bool {
    s.any(&["deprecated", "warning", "slow", "not recommended"])
}

fn is_checkout(s: &Signals) -> bool {
    s.url.contains("checkout") || s.url.contains("/cart") || s.any(&["add to cart", "checkout", "payment"])
}

fn is_api(s: &Signals) -> bool {
    s.url.contains("/api/") || has_network_error(s)
}

fn is_search(s: &Signals) -> bool {
    s.url.contains("search") || s.url.contains("?q=")
}

fn http_header(s: &Signals) -> String {
    let status = http_status(s).unwrap_or(500);
    format!("## HTTP {} {}", status, reason_phrase(status))
}

fn auth_header(_: &Signals) -> String {
    "## Authentication Problem".to_string()
}

fn type_error_header(_: &Signals) -> String {
    "## JavaScript TypeError".to_string()
}

fn reference_error_header(_: &Signals) -> String {
    "## JavaScript ReferenceError".to_string()
}

fn network_header(_: &Signals) -> String {
    "## Network Request Failure".to_string()
}

fn validation_header(_: &Signals) -> String {
    "## Form Validation Error".to_string()
}

fn service_header(s: &Signals) -> String {
    format!("## Issue on {}", known_service(s).unwrap_or("Known Service"))
}

fn generic_header(_: &Signals) -> String {
    "## Page Issue Report".to_string()
}

/// Header rules, highest priority first
pub static HEADER_RULES: &[HeaderRule] = &[
    HeaderRule {
        name: "http-error",
        matches: has_http_status,
        header: http_header,
    },
    HeaderRule {
        name: "authentication",
        matches: has_auth_signal,
        header: auth_header,
    },
    HeaderRule {
        name: "type-error",
        matches: has_type_error,
        header: type_error_header,
    },
    HeaderRule {
        name: "reference-error",
        matches: has_reference_error,
        header: reference_error_header,
    },
    HeaderRule {
        name: "network-error",
        matches: has_network_error,
        header: network_header,
    },
    HeaderRule {
        name: "validation-error",
        matches: has_validation_error,
        header: validation_header,
    },
    HeaderRule {
        name: "known-service",
        matches: is_known_service,
        header: service_header,
    },
    HeaderRule {
        name: "generic",
        matches: always,
        header: generic_header,
    },
];

/// Severity rules, highest priority first
pub static SEVERITY_RULES: &[LabelRule] = &[
    LabelRule {
        name: "server-error",
        matches: is_server_error,
        label: "critical error",
        confidence: 95,
    },
    LabelRule {
        name: "fatal-terms",
        matches: has_fatal_terms,
        label: "critical error",
        confidence: 85,
    },
    LabelRule {
        name: "client-error",
        matches: has_http_status,
        label: "warning",
        confidence: 85,
    },
    LabelRule {
        name: "js-error",
        matches: has_js_error,
        label: "warning",
        confidence: 80,
    },
    LabelRule {
        name: "network-error",
        matches: has_network_error,
        label: "warning",
        confidence: 75,
    },
    LabelRule {
        name: "any-issue",
        matches: has_any_issue,
        label: "minor issue",
        confidence: 65,
    },
    LabelRule {
        name: "minor-terms",
        matches: has_minor_terms,
        label: "minor issue",
        confidence: 55,
    },
    LabelRule {
        name: "default",
        matches: always,
        label: "informational",
        confidence: 50,
    },
];

/// Context rules, highest priority first
pub static CONTEXT_RULES: &[LabelRule] = &[
    LabelRule {
        name: "local-development",
        matches: is_local,
        label: "local development",
        confidence: 90,
    },
    LabelRule {
        name: "authentication",
        matches: has_auth_signal,
        label: "authentication flow",
        confidence: 85,
    },
    LabelRule {
        name: "checkout",
        matches: is_checkout,
        label: "e-commerce checkout",
        confidence: 80,
    },
    LabelRule {
        name: "form",
        matches: has_validation_error,
        label: "form submission",
        confidence: 75,
    },
    LabelRule {
        name: "api",
        matches: is_api,
        label: "API communication",
        confidence: 70,
    },
    LabelRule {
        name: "search",
        matches: is_search,
        label: "search results",
        confidence: 60,
    },
    LabelRule {
        name: "default",
        matches: always,
        label: "general browsing",
        confidence: 40,
    },
];

fn first_label(rules: &[LabelRule], signals: &Signals) -> (String, u8) {
    rules
        .iter()
        .find(|rule| (rule.matches)(signals))
        .map(|rule| {
            ::log::trace!("Label rule matched: {}", rule.name);
            (rule.label.to_string(), rule.confidence)
        })
        .unwrap_or_else(|| ("informational".to_string(), 0))
}

/// Header text from the first matching header rule
pub fn classify_header(signals: &Signals) -> String {
    HEADER_RULES
        .iter()
        .find(|rule| (rule.matches)(signals))
        .map(|rule| {
            ::log::debug!("Header rule matched: {}", rule.name);
            (rule.header)(signals)
        })
        .unwrap_or_else(|| "## Page Issue Report".to_string())
}

/// Severity band and its confidence
pub fn assess_severity(snapshot: &PageSnapshot) -> (String, u8) {
    first_label(SEVERITY_RULES, &Signals::from_snapshot(snapshot))
}

/// Context label and its confidence
pub fn assess_context(snapshot: &PageSnapshot) -> (String, u8) {
    first_label(CONTEXT_RULES, &Signals::from_snapshot(snapshot))
}

/// Classify a snapshot. Never fails.
pub fn classify(snapshot: &PageSnapshot) -> HeuristicAnalysis {
    let signals = Signals::from_snapshot(snapshot);
    let (severity, severity_confidence) = first_label(SEVERITY_RULES, &signals);
    let (context, context_confidence) = first_label(CONTEXT_RULES, &signals);

    HeuristicAnalysis {
        header: classify_header(&signals),
        severity,
        severity_confidence,
        context,
        context_confidence,
    }
}
