use serde::{Deserialize, Serialize};

/// Outcome of the analysis step. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum AnalysisResult {
    /// Produced by a remote model
    Ai(AiAnalysis),
    /// Produced by the local rule engine
    Heuristic(HeuristicAnalysis),
}

impl AnalysisResult {
    /// Value of the `source` tag
    pub fn source(&self) -> &'static str {
        match self {
            AnalysisResult::Ai(_) => "ai",
            AnalysisResult::Heuristic(_) => "heuristic",
        }
    }

    pub fn header(&self) -> &str {
        match self {
            AnalysisResult::Ai(ai) => &ai.header,
            AnalysisResult::Heuristic(h) => &h.header,
        }
    }
}

/// Structured answer from a model. Every field is already coerced to text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub header: String,
    pub severity: String,
    pub severity_confidence: String,
    pub category: String,
    pub category_confidence: String,
    pub summary: String,
    pub root_cause: String,
    pub user_impact: String,
    pub technical_details: String,
    pub suggested_fix: String,
    pub priority: String,
}

/// Result of the ordered-rule classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicAnalysis {
    pub header: String,
    pub severity: String,
    pub severity_confidence: u8,
    pub context: String,
    pub context_confidence: u8,
}

/// Message handed to the outbound transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub report: String,
}

impl ReportMessage {
    pub const KIND: &'static str = "bugReportData";

    pub fn new(report: String) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_serialization() {
        let result = AnalysisResult::Heuristic(HeuristicAnalysis {
            header: "## X".into(),
            severity: "warning".into(),
            severity_confidence: 70,
            context: "general browsing".into(),
            context_confidence: 40,
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["source"], "heuristic");
        assert_eq!(value["severityConfidence"], 70);
        assert_eq!(result.source(), "heuristic");
    }

    #[test]
    fn test_report_message_shape() {
        let value = serde_json::to_value(ReportMessage::new("body".into())).unwrap();
        assert_eq!(value, serde_json::json!({"type": "bugReportData", "report": "body"}));
    }
}
