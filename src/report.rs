//! Flattens a snapshot and its analysis into the delivered report text.
//!
//! Section order is fixed and every section is always present; empty data
//! renders a placeholder line instead of omitting the section.

use crate::results::{AiAnalysis, AnalysisResult, HeuristicAnalysis};
use crate::snapshot::{FrameworkSnapshot, PageSnapshot, PerformanceSnapshot};
use std::fmt::Write;

pub const AI_SECTION: &str = "=== AI Analysis ===";
pub const PATTERN_SECTION: &str = "=== Pattern Analysis ===";
pub const PAGE_SECTION: &str = "=== Page Information ===";
pub const CONSOLE_SECTION: &str = "=== Console Activity ===";
pub const DOM_SECTION: &str = "=== DOM Issues ===";
pub const PERFORMANCE_SECTION: &str = "=== Performance ===";
pub const FRAMEWORK_SECTION: &str = "=== Framework ===";

pub const NO_CONSOLE_ACTIVITY: &str = "No console activity captured.";
pub const NO_DOM_ISSUES: &str = "No DOM issues detected.";
const NO_PERFORMANCE_DATA: &str = "No performance data collected.";
const NO_FRAMEWORK: &str = "No framework detected.";
const FRAMEWORK_UNAVAILABLE: &str = "Framework detection unavailable.";
const NOT_PROVIDED: &str = "Not provided";
const FALLBACK_HEADER: &str = "## Page Issue Report";

/// Render the report for one run
pub fn synthesize(snapshot: &PageSnapshot, analysis: &AnalysisResult) -> String {
    let mut out = String::new();

    let header = analysis.header().trim();
    let _ = writeln!(out, "{}\n", if header.is_empty() { FALLBACK_HEADER } else { header });

    match analysis {
        AnalysisResult::Ai(ai) => write_ai_section(&mut out, ai),
        AnalysisResult::Heuristic(h) => write_pattern_section(&mut out, h),
    }

    write_page_section(&mut out, &snapshot.url, &snapshot.title, &snapshot.timestamp);

    let _ = writeln!(out, "\n{}", CONSOLE_SECTION);
    if snapshot.console_entries.is_empty() {
        let _ = writeln!(out, "{}", NO_CONSOLE_ACTIVITY);
    }
    for entry in &snapshot.console_entries {
        let _ = writeln!(out, "[{}] {}", entry.level.as_str().to_uppercase(), entry.message());
    }

    let _ = writeln!(out, "\n{}", DOM_SECTION);
    if snapshot.dom_issues.is_empty() {
        let _ = writeln!(out, "{}", NO_DOM_ISSUES);
    }
    for issue in &snapshot.dom_issues {
        let _ = writeln!(out, "- {}", issue);
    }

    let _ = writeln!(out, "\n{}", PERFORMANCE_SECTION);
    match &snapshot.performance_snapshot {
        Some(perf) if !perf.is_empty() => write_performance(&mut out, perf),
        _ => {
            let _ = writeln!(out, "{}", NO_PERFORMANCE_DATA);
        }
    }

    let _ = writeln!(out, "\n{}", FRAMEWORK_SECTION);
    match &snapshot.framework_snapshot {
        Some(FrameworkSnapshot::Detected(report)) => {
            let version = report.version.as_deref().map(|v| format!(" {}", v)).unwrap_or_default();
            let _ = writeln!(out, "{}{} ({} components)", report.framework, version, report.component_count);
            for (pattern, count) in &report.anti_patterns {
                let _ = writeln!(out, "- Anti-pattern: {} x{}", pattern, count);
            }
        }
        Some(FrameworkSnapshot::NotDetected) => {
            let _ = writeln!(out, "{}", NO_FRAMEWORK);
        }
        None => {
            let _ = writeln!(out, "{}", FRAMEWORK_UNAVAILABLE);
        }
    }

    out
}

/// Minimal report used when collection itself failed
pub fn synthesize_failure(error: &str, url: &str, timestamp: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Page Analysis Failed\n");
    let _ = writeln!(out, "Analysis failed: {}", error);
    write_page_section(&mut out, url, "", timestamp);
    out
}

fn or_placeholder(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() { NOT_PROVIDED } else { value }
}

fn write_ai_section(out: &mut String, ai: &AiAnalysis) {
    let _ = writeln!(out, "{}", AI_SECTION);
    let _ = writeln!(
        out,
        "Severity: {} (confidence: {})",
        or_placeholder(&ai.severity),
        or_placeholder(&ai.severity_confidence)
    );
    let _ = writeln!(
        out,
        "Category: {} (confidence: {})",
        or_placeholder(&ai.category),
        or_placeholder(&ai.category_confidence)
    );
    let _ = writeln!(out, "Priority: {}", or_placeholder(&ai.priority));
    let _ = writeln!(out, "Summary: {}", or_placeholder(&ai.summary));
    let _ = writeln!(out, "Root Cause: {}", or_placeholder(&ai.root_cause));
    let _ = writeln!(out, "User Impact: {}", or_placeholder(&ai.user_impact));
    let _ = writeln!(out, "Technical Details: {}", or_placeholder(&ai.technical_details));
    let _ = writeln!(out, "Suggested Fix: {}", or_placeholder(&ai.suggested_fix));
}

fn write_pattern_section(out: &mut String, h: &HeuristicAnalysis) {
    let _ = writeln!(out, "{}", PATTERN_SECTION);
    let _ = writeln!(out, "Severity: {} (confidence: {}%)", h.severity, h.severity_confidence);
    let _ = writeln!(out, "Context: {} (confidence: {}%)", h.context, h.context_confidence);
}

fn write_page_section(out: &mut String, url: &str, title: &str, timestamp: &str) {
    let _ = writeln!(out, "\n{}", PAGE_SECTION);
    let _ = writeln!(out, "URL: {}", or_placeholder(url));
    let _ = writeln!(out, "Title: {}", or_placeholder(title));
    let _ = writeln!(out, "Captured: {}", or_placeholder(timestamp));
}

fn write_performance(out: &mut String, perf: &PerformanceSnapshot) {
    if perf.core_vitals.is_empty() {
        let _ = writeln!(out, "Core Web Vitals: none reported");
    }
    for (metric, reading) in &perf.core_vitals {
        let unit = if metric == "CLS" { "" } else { "ms" };
        let _ = writeln!(out, "{}: {}{} ({})", metric, reading.value, unit, reading.rating.as_str());
    }

    let poor = perf.poor_vitals();
    if !poor.is_empty() {
        let _ = writeln!(out, "Poor Core Web Vitals: {}", poor.join(", "));
    }

    if !perf.long_tasks.is_empty() {
        let total: f64 = perf.long_tasks.iter().map(|t| t.duration).sum();
        let _ = writeln!(out, "Long tasks: {} ({}ms total)", perf.long_tasks.len(), total.round());
    }
    for resource in &perf.slow_resources {
        let _ = writeln!(out, "- Slow resource: {} ({}ms)", resource.name, resource.duration.round());
    }
    for failure in &perf.network_failures {
        match failure.status {
            Some(status) => {
                let _ = writeln!(out, "- Network failure: {} (HTTP {})", failure.name, status);
            }
            None => {
                let _ = writeln!(out, "- Network failure: {}", failure.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{
        ConsoleEntry, ConsoleLevel, FrameworkReport, NetworkFailure, Rating, VitalReading,
    };

    fn heuristic() -> AnalysisResult {
        AnalysisResult::Heuristic(HeuristicAnalysis {
            header: "## Page Issue Report".into(),
            severity: "informational".into(),
            severity_confidence: 50,
            context: "general browsing".into(),
            context_confidence: 40,
        })
    }

    fn empty_snapshot() -> PageSnapshot {
        PageSnapshot::new("https://example.com", "", "2024-01-01T00:00:00.000Z")
    }

    #[test]
    fn test_empty_inputs_keep_every_section() {
        let report = synthesize(&empty_snapshot(), &heuristic());

        for label in [
            PATTERN_SECTION,
            PAGE_SECTION,
            CONSOLE_SECTION,
            DOM_SECTION,
            PERFORMANCE_SECTION,
            FRAMEWORK_SECTION,
        ] {
            assert!(report.contains(label), "missing {}", label);
        }
        assert!(report.starts_with("## Page Issue Report\n"));
        assert!(report.contains(NO_CONSOLE_ACTIVITY));
        assert!(report.contains(NO_DOM_ISSUES));
        assert!(report.contains("Title: Not provided"));
    }

    #[test]
    fn test_sections_are_ordered() {
        let report = synthesize(&empty_snapshot(), &heuristic());
        let positions: Vec<usize> = [PATTERN_SECTION, PAGE_SECTION, CONSOLE_SECTION, DOM_SECTION]
            .iter()
            .map(|label| report.find(label).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_ai_label_and_placeholders() {
        let analysis = AnalysisResult::Ai(AiAnalysis {
            header: "## Checkout crash".into(),
            severity: "high".into(),
            summary: "Cart fails".into(),
            ..AiAnalysis::default()
        });
        let report = synthesize(&empty_snapshot(), &analysis);
        assert!(report.contains(AI_SECTION));
        assert!(!report.contains(PATTERN_SECTION));
        assert!(report.starts_with("## Checkout crash"));
        assert!(report.contains("Summary: Cart fails"));
        assert!(report.contains("Root Cause: Not provided"));
    }

    #[test]
    fn test_empty_ai_header_falls_back() {
        let report = synthesize(&empty_snapshot(), &AnalysisResult::Ai(AiAnalysis::default()));
        assert!(report.starts_with(FALLBACK_HEADER));
    }

    #[test]
    fn test_signals_are_rendered() {
        let mut snapshot = empty_snapshot();
        snapshot.console_entries.push(ConsoleEntry::new(
            ConsoleLevel::Error,
            vec!["Uncaught".into(), "boom".into()],
            "t",
        ));
        snapshot.dom_issues.push("Alert: Payment declined".into());
        let mut perf = PerformanceSnapshot::default();
        perf.core_vitals.insert(
            "LCP".into(),
            VitalReading {
                value: 4200.0,
                rating: Rating::Poor,
            },
        );
        perf.network_failures.push(NetworkFailure {
            name: "https://api.example.com/pay".into(),
            status: Some(502),
        });
        snapshot.performance_snapshot = Some(perf);
        snapshot.framework_snapshot = Some(FrameworkSnapshot::Detected(FrameworkReport {
            framework: "React".into(),
            version: Some("18.2.0".into()),
            component_count: 12,
            ..FrameworkReport::default()
        }));

        let report = synthesize(&snapshot, &heuristic());
        assert!(report.contains("[ERROR] Uncaught boom"));
        assert!(report.contains("- Alert: Payment declined"));
        assert!(report.contains("LCP: 4200ms (poor)"));
        assert!(report.contains("Poor Core Web Vitals: LCP"));
        assert!(report.contains("- Network failure: https://api.example.com/pay (HTTP 502)"));
        assert!(report.contains("React 18.2.0 (12 components)"));
        assert!(!report.contains(NO_CONSOLE_ACTIVITY));
    }

    #[test]
    fn test_failure_report() {
        let report = synthesize_failure("page went away", "https://example.com", "2024-01-01T00:00:00.000Z");
        assert!(report.contains("Analysis failed: page went away"));
        assert!(report.contains("URL: https://example.com"));
        assert!(report.contains("Captured: 2024-01-01T00:00:00.000Z"));
    }
}
