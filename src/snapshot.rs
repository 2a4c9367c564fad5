use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything collected from a page in one run. Built once, then only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// URL of the page
    pub url: String,

    /// Document title (empty when unavailable)
    pub title: String,

    /// Bounded excerpt of the visible body text
    pub content_excerpt: String,

    /// Console entries in chronological order
    pub console_entries: Vec<ConsoleEntry>,

    /// Human-readable DOM issue descriptions
    pub dom_issues: Vec<String>,

    /// Performance sample, when the sampler produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_snapshot: Option<PerformanceSnapshot>,

    /// Framework detection result, when detection ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_snapshot: Option<FrameworkSnapshot>,

    /// ISO-8601 capture time
    pub timestamp: String,
}

impl PageSnapshot {
    /// Create a snapshot with only the page identity filled in
    pub fn new(url: impl Into<String>, title: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content_excerpt: String::new(),
            console_entries: Vec::new(),
            dom_issues: Vec::new(),
            performance_snapshot: None,
            framework_snapshot: None,
            timestamp: timestamp.into(),
        }
    }

    /// Console entries at `warn` or `error` level
    pub fn problem_entries(&self) -> impl Iterator<Item = &ConsoleEntry> {
        self.console_entries
            .iter()
            .filter(|e| matches!(e.level, ConsoleLevel::Warn | ConsoleLevel::Error))
    }
}

/// Console method an entry was logged through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        }
    }
}

/// One captured console call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,

    /// Arguments rendered to strings at call time
    #[serde(deserialize_with = "rendered_args")]
    pub rendered_args: Vec<String>,

    /// ISO-8601 time of the call
    pub timestamp: String,
}

impl ConsoleEntry {
    pub fn new(level: ConsoleLevel, rendered_args: Vec<String>, timestamp: impl Into<String>) -> Self {
        Self {
            level,
            rendered_args,
            timestamp: timestamp.into(),
        }
    }

    /// Arguments joined with single spaces, as the console would print them
    pub fn message(&self) -> String {
        self.rendered_args.join(" ")
    }
}

/// Core Web Vitals band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    /// Rate a metric value against the published thresholds.
    ///
    /// Returns `None` for metrics without known thresholds.
    pub fn classify(metric: &str, value: f64) -> Option<Self> {
        let (good, poor) = match metric {
            "LCP" => (2500.0, 4000.0),
            "FID" => (100.0, 300.0),
            "CLS" => (0.1, 0.25),
            _ => return None,
        };

        Some(if value < good {
            Rating::Good
        } else if value < poor {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs-improvement",
            Rating::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    pub value: f64,
    pub rating: Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTask {
    pub duration: f64,
    pub start_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowResource {
    pub name: String,
    pub duration: f64,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkFailure {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Result of one performance sampling window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub core_vitals: BTreeMap<String, VitalReading>,
    pub long_tasks: Vec<LongTask>,
    pub slow_resources: Vec<SlowResource>,
    pub network_failures: Vec<NetworkFailure>,
}

impl PerformanceSnapshot {
    pub fn is_empty(&self) -> bool {
        self.core_vitals.is_empty()
            && self.long_tasks.is_empty()
            && self.slow_resources.is_empty()
            && self.network_failures.is_empty()
    }

    /// Names of vitals rated `poor`
    pub fn poor_vitals(&self) -> Vec<&str> {
        self.core_vitals
            .iter()
            .filter(|(_, reading)| reading.rating == Rating::Poor)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Sentinel for an argument the page could not render
pub const UNSERIALIZABLE_ARG: &str = "[Unserializable]";

/// Accept any JSON value per argument; a missing rendering becomes the sentinel
fn rendered_args<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| match value {
            Value::String(s) => s,
            Value::Null => UNSERIALIZABLE_ARG.to_string(),
            other => other.to_string(),
        })
        .collect())
}

/// What the framework detector found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FrameworkSnapshot {
    Detected(FrameworkReport),
    NotDetected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkReport {
    /// Framework name as reported by the probe
    #[serde(default)]
    pub framework: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number of components (or component roots) the probe could count
    #[serde(default)]
    pub component_count: u64,

    /// Known anti-pattern name to occurrence count
    #[serde(default)]
    pub anti_patterns: BTreeMap<String, u64>,
}
