use crate::snapshot::{FrameworkSnapshot, PageSnapshot};
use std::fmt::Write;

/// Most recent console entries included in a prompt
pub const MAX_PROMPT_CONSOLE_ENTRIES: usize = 50;

/// DOM issues included in a prompt
pub const MAX_PROMPT_DOM_ISSUES: usize = 30;

const RESPONSE_SCHEMA: &str = r###"{
  "header": "## short markdown title naming the main problem",
  "severity": "critical | high | medium | low",
  "severityConfidence": 0-100,
  "category": "e.g. javascript-error, network, http-error, authentication, validation, performance, ui",
  "categoryConfidence": 0-100,
  "summary": "one or two sentences",
  "rootCause": "most likely cause",
  "userImpact": "what the user experiences",
  "technicalDetails": "relevant errors, resources and metrics",
  "suggestedFix": "concrete next steps",
  "priority": "P1 | P2 | P3 | P4"
}"###;

/// Build the analysis prompt for a snapshot
pub fn build_prompt(snapshot: &PageSnapshot) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are a senior web engineer triaging a bug report. Analyze the page data \
         below and identify the most likely issue.\n\n",
    );

    let _ = writeln!(prompt, "URL: {}", snapshot.url);
    let _ = writeln!(prompt, "Title: {}", snapshot.title);
    let _ = writeln!(prompt, "Captured at: {}", snapshot.timestamp);
    let _ = writeln!(prompt, "\nPage content (excerpt):\n{}", snapshot.content_excerpt);

    prompt.push_str("\nConsole entries:\n");
    if snapshot.console_entries.is_empty() {
        prompt.push_str("(none)\n");
    } else {
        let skip = snapshot
            .console_entries
            .len()
            .saturating_sub(MAX_PROMPT_CONSOLE_ENTRIES);
        for entry in snapshot.console_entries.iter().skip(skip) {
            let _ = writeln!(
                prompt,
                "[{}] {} {}",
                entry.level.as_str().to_uppercase(),
                entry.timestamp,
                entry.message()
            );
        }
    }

    prompt.push_str("\nDOM issues:\n");
    if snapshot.dom_issues.is_empty() {
        prompt.push_str("(none)\n");
    } else {
        for issue in snapshot.dom_issues.iter().take(MAX_PROMPT_DOM_ISSUES) {
            let _ = writeln!(prompt, "- {}", issue);
        }
    }

    if let Some(perf) = &snapshot.performance_snapshot {
        if let Ok(json) = serde_json::to_string(perf) {
            let _ = writeln!(prompt, "\nPerformance data:\n{}", json);
        }
    }

    if let Some(FrameworkSnapshot::Detected(report)) = &snapshot.framework_snapshot {
        if let Ok(json) = serde_json::to_string(report) {
            let _ = writeln!(prompt, "\nFramework data:\n{}", json);
        }
    }

    let _ = write!(
        prompt,
        "\nRespond with a single JSON object and nothing else, using exactly this schema:\n{}\n",
        RESPONSE_SCHEMA
    );

    prompt
}
