//! Recovers a structured analysis from loosely formatted model output.
//!
//! Stage one strips code-fence markup. Stage two scans for the first
//! bracket-balanced JSON value that actually parses, honouring string
//! literals and escapes. An array yields its first object.

use crate::results::AiAnalysis;
use crate::utils::truncate_chars;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

/// Fields a response must carry to count as structured
pub const REQUIRED_FIELDS: [&str; 4] = ["header", "severity", "category", "summary"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("no JSON object found")]
    NoJson,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

static SEVERITY_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(critical|high|medium|low)\b").expect("severity pattern is valid")
});

/// Remove Markdown code-fence markers (```json, ```), keeping whatever shares their line
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if !trimmed.starts_with("```") && !trimmed.ends_with("```") {
                return Some(line);
            }
            let mut rest = trimmed;
            if let Some(after) = rest.strip_prefix("```") {
                rest = after.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            }
            if let Some(before) = rest.strip_suffix("```") {
                rest = before;
            }
            let rest = rest.trim();
            (!rest.is_empty()).then_some(rest)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte length of the balanced value starting at `text[0]`, which must be `{` or `[`
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// First JSON object in `text`, looking inside a leading array if needed
pub fn find_first_object(text: &str) -> Option<Map<String, Value>> {
    let mut offset = 0;

    while let Some(pos) = text[offset..].find(['{', '[']) {
        let start = offset + pos;
        if let Some(len) = balanced_len(&text[start..]) {
            match serde_json::from_str::<Value>(&text[start..start + len]) {
                Ok(Value::Object(map)) => return Some(map),
                Ok(Value::Array(items)) => {
                    if let Some(map) = items.into_iter().find_map(|v| match v {
                        Value::Object(map) => Some(map),
                        _ => None,
                    }) {
                        return Some(map);
                    }
                }
                _ => {}
            }
        }
        // Not a usable value; retry from the next bracket
        offset = start + 1;
    }
    None
}

/// Render any JSON value as display text
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(coerce_to_string).collect::<Vec<_>>().join("; "),
        Value::Object(_) => value.to_string(),
    }
}

/// Parse a model answer that must contain the structured JSON object
pub fn parse_structured(text: &str) -> Result<AiAnalysis, ParseError> {
    let cleaned = strip_code_fences(text);
    let map = find_first_object(&cleaned).ok_or(ParseError::NoJson)?;

    for field in REQUIRED_FIELDS {
        if !map.contains_key(field) {
            return Err(ParseError::MissingField(field));
        }
    }

    let field = |name: &str| map.get(name).map(coerce_to_string).unwrap_or_default();
    Ok(AiAnalysis {
        header: field("header"),
        severity: field("severity"),
        severity_confidence: field("severityConfidence"),
        category: field("category"),
        category_confidence: field("categoryConfidence"),
        summary: field("summary"),
        root_cause: field("rootCause"),
        user_impact: field("userImpact"),
        technical_details: field("technicalDetails"),
        suggested_fix: field("suggestedFix"),
        priority: field("priority"),
    })
}

/// Most severe whole-word severity keyword in free text
fn severity_keyword(text: &str) -> &'static str {
    let found: Vec<String> = SEVERITY_WORD
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    ["critical", "high", "medium", "low"]
        .into_iter()
        .find(|k| found.iter().any(|word| word == k))
        .unwrap_or("medium")
}

/// Build a best-effort analysis from unstructured text
pub fn best_effort(text: &str) -> AiAnalysis {
    let cleaned = strip_code_fences(text);
    let header = cleaned
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(str::to_string)
        .unwrap_or_else(|| "## AI Analysis".to_string());

    AiAnalysis {
        header,
        severity: severity_keyword(&cleaned).to_string(),
        category: "unclassified".to_string(),
        summary: truncate_chars(cleaned.trim(), 500),
        technical_details: "Model response was not valid structured JSON".to_string(),
        ..AiAnalysis::default()
    }
}

/// Interpret a non-empty model answer. Never fails.
pub fn interpret(text: &str) -> AiAnalysis {
    match parse_structured(text) {
        Ok(analysis) => analysis,
        Err(e) => {
            ::log::warn!("Falling back to best-effort parse: {}", e);
            best_effort(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_array_of_one_object() {
        let text = "```json\n[{\"header\":\"## X\",\"severity\":\"high\",\"category\":\"c\",\"summary\":\"s\"}]\n```";
        let analysis = parse_structured(text).unwrap();
        assert_eq!(analysis.header, "## X");
        assert_eq!(analysis.severity, "high");
        assert_eq!(analysis.category, "c");
        assert_eq!(analysis.summary, "s");
        assert_eq!(analysis.root_cause, "");
    }

    #[test]
    fn test_unfenced_object() {
        let text = r###"{"header":"## Y","severity":"low","category":"ui","summary":"ok","priority":"P3"}"###;
        let analysis = parse_structured(text).unwrap();
        assert_eq!(analysis.header, "## Y");
        assert_eq!(analysis.priority, "P3");
    }

    #[test]
    fn test_prose_prefixed_object() {
        let text = "Sure! Here is the analysis you asked for [as JSON]:\n\
                    {\"header\":\"## Z\",\"severity\":\"critical\",\"category\":\"js\",\"summary\":\"Crash {in} render\"}\n\
                    Let me know if you need more.";
        let analysis = parse_structured(text).unwrap();
        assert_eq!(analysis.header, "## Z");
        assert_eq!(analysis.summary, "Crash {in} render");
    }

    #[test]
    fn test_braces_and_quotes_inside_strings() {
        let text = r###"{"header":"## \"Quoted\" }","severity":"high","category":"c","summary":"a ] b"}"###;
        let analysis = parse_structured(text).unwrap();
        assert_eq!(analysis.header, "## \"Quoted\" }");
        assert_eq!(analysis.summary, "a ] b");
    }

    #[test]
    fn test_fields_coerced_to_strings() {
        let text = r###"{"header":"## N","severity":"high","severityConfidence":92,"category":"c",
                       "categoryConfidence":null,"summary":"s","technicalDetails":["a","b"],
                       "suggestedFix":{"step":1},"priority":true}"###;
        let analysis = parse_structured(text).unwrap();
        assert_eq!(analysis.severity_confidence, "92");
        assert_eq!(analysis.category_confidence, "");
        assert_eq!(analysis.technical_details, "a; b");
        assert_eq!(analysis.suggested_fix, r#"{"step":1}"#);
        assert_eq!(analysis.priority, "true");
    }

    #[test]
    fn test_missing_required_field() {
        let text = r###"{"header":"## N","severity":"high","summary":"s"}"###;
        assert_eq!(parse_structured(text), Err(ParseError::MissingField("category")));
    }

    #[test]
    fn test_no_json() {
        assert_eq!(parse_structured("nothing here"), Err(ParseError::NoJson));
        assert_eq!(parse_structured("{ unbalanced"), Err(ParseError::NoJson));
    }

    #[test]
    fn test_find_first_object_skips_invalid_candidates() {
        let map = find_first_object("[not json] then {\"a\": 1}").unwrap();
        assert_eq!(map.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_best_effort_extracts_severity_and_header() {
        let text = "# Checkout broken\nThis looks like a HIGH severity problem with the cart.";
        let analysis = interpret(text);
        assert_eq!(analysis.header, "# Checkout broken");
        assert_eq!(analysis.severity, "high");
        assert!(analysis.summary.contains("cart"));
    }

    #[test]
    fn test_best_effort_defaults() {
        let analysis = best_effort("Everything seems fine.");
        assert_eq!(analysis.header, "## AI Analysis");
        assert_eq!(analysis.severity, "medium");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
        assert_eq!(strip_code_fences("```json {\"a\":1} ```"), "{\"a\":1}");
    }

    #[test]
    fn test_single_line_fence_keeps_json() {
        let text = r###"```json {"header":"## X","severity":"high","category":"c","summary":"s"} ```"###;
        let analysis = parse_structured(text).unwrap();
        assert_eq!(analysis.header, "## X");
        assert_eq!(analysis.summary, "s");
    }

    #[test]
    fn test_severity_matches_whole_words() {
        assert_eq!(best_effort("Follow the steps below to reproduce.").severity, "medium");
        assert_eq!(best_effort("Highlight the slow allow-list").severity, "medium");
        assert_eq!(best_effort("Low impact, but one Critical path").severity, "critical");
    }
}
