use crate::page::PageContext;
use crate::utils::{normalize_whitespace, truncate_chars};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Longest single issue description
pub const MAX_ISSUE_CHARS: usize = 200;

/// Most issues kept per scan
pub const MAX_ISSUES: usize = 50;

/// Selectors that conventionally carry error or validation messages
const ERROR_SELECTORS: [&str; 12] = [
    r#"[role="alert"]"#,
    ".alert-danger",
    ".alert-error",
    ".error",
    ".error-message",
    ".errors",
    ".invalid-feedback",
    ".field-error",
    ".validation-error",
    ".form-error",
    ".help-block.error",
    r#"[aria-invalid="true"]"#,
];

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

static STATUS_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([45]\d{2})\s*[:\-–]?\s*(bad request|unauthorized|forbidden|not found|method not allowed|request timeout|conflict|gone|too many requests|internal server error|not implemented|bad gateway|service unavailable|gateway time-?out)\b",
    )
    .expect("status code pattern is valid")
});

/// What the DOM scan produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomScan {
    pub content_excerpt: String,
    pub issues: Vec<String>,
}

/// Scans the serialized DOM for error signals and the visible text excerpt
#[derive(Debug, Clone)]
pub struct DomCollector {
    excerpt_chars: usize,
}

impl DomCollector {
    pub fn new(excerpt_chars: usize) -> Self {
        Self { excerpt_chars }
    }

    pub async fn collect(&self, page: &dyn PageContext) -> DomScan {
        match page.source().await {
            Ok(html) => self.scan(&html),
            Err(e) => {
                // Mid-navigation pages commonly fail here
                ::log::warn!("DOM collection partial failure: {}", e);
                DomScan::default()
            }
        }
    }

    /// Scan an HTML document
    pub fn scan(&self, html: &str) -> DomScan {
        let doc = Html::parse_document(html);
        let text = visible_text(&doc);

        DomScan {
            content_excerpt: truncate_chars(&text, self.excerpt_chars),
            issues: scan_issues(&doc, &text),
        }
    }
}

/// Whitespace-normalized text of `<body>`, skipping non-rendered elements
pub fn visible_text(doc: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };

    let mut chunks = Vec::new();
    for body in doc.select(&body_selector) {
        collect_text(body, &mut chunks);
    }
    normalize_whitespace(&chunks.join(" "))
}

fn collect_text<'a>(element: ElementRef<'a>, chunks: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => chunks.push(text),
            Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, chunks);
                }
            }
            _ => {}
        }
    }
}

/// Collect issue descriptions from error-bearing elements and status codes in text
pub fn scan_issues(doc: &Html, visible_text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut issues = Vec::new();
    let mut push = |issue: String| {
        if issues.len() < MAX_ISSUES && seen.insert(issue.clone()) {
            issues.push(issue);
        }
    };

    for raw in ERROR_SELECTORS {
        let selector = match Selector::parse(raw) {
            Ok(selector) => selector,
            Err(e) => {
                ::log::debug!("Skipping selector {}: {:?}", raw, e);
                continue;
            }
        };

        for element in doc.select(&selector) {
            if let Some(issue) = describe_element(raw, element) {
                push(truncate_chars(&issue, MAX_ISSUE_CHARS));
            }
        }
    }

    for caps in STATUS_CODE.captures_iter(visible_text) {
        let issue = format!("HTTP {} {} mentioned in page text", &caps[1], caps[2].to_lowercase());
        push(truncate_chars(&issue, MAX_ISSUE_CHARS));
    }

    ::log::debug!("DOM scan found {} issues", issues.len());
    issues
}

fn describe_element(selector: &str, element: ElementRef) -> Option<String> {
    let text = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));

    if selector.contains("aria-invalid") {
        // Inputs have no text; name the field instead
        let el = element.value();
        let field = el
            .attr("name")
            .or_else(|| el.attr("id"))
            .or_else(|| el.attr("aria-label"))
            .unwrap_or(el.name());
        return Some(format!("Invalid field: {}", field));
    }

    if text.is_empty() {
        return None;
    }
    Some(format!("{}: {}", selector_label(selector), text))
}

fn selector_label(selector: &str) -> &'static str {
    match selector {
        r#"[role="alert"]"# => "Alert",
        ".invalid-feedback" | ".field-error" | ".validation-error" | ".form-error" => {
            "Validation message"
        }
        _ => "Error message",
    }
}
