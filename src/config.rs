use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Which analysis backend the pipeline should try first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    /// Remote model, falling back to the rule engine
    #[default]
    Gemini,
    /// Rule engine only, no network
    Pattern,
}

/// Top-level configuration for a report run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub ai_mode: AiMode,

    /// API key for the generative-text service. Empty disables the remote path.
    #[serde(default)]
    pub api_key: String,

    /// Model identifiers in the order they are tried
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Base URL of the generative-text API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for each model request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub console: ConsoleCaptureConfig,

    /// How long the performance sampler observes the page
    #[serde(default = "default_sampling_window_ms")]
    pub sampling_window_ms: u64,

    /// Maximum characters of visible text kept in the snapshot
    #[serde(default = "default_content_excerpt_chars")]
    pub content_excerpt_chars: usize,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

/// Sampling parameters sent with every model request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

/// Console capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleCaptureConfig {
    /// Cap on entries kept in the page between reads (oldest dropped)
    #[serde(default = "default_console_max_entries")]
    pub max_entries: usize,

    /// Delay before reading the buffer so late async logs are included
    #[serde(default = "default_capture_window_ms")]
    pub capture_window_ms: u64,

    /// Regex patterns for messages to drop (take precedence over includes)
    #[serde(default = "default_console_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Regex patterns a message must match to be kept (empty keeps all)
    #[serde(default)]
    pub include_patterns: Vec<String>,
}

fn default_models() -> Vec<String> {
    vec![
        "gemini-2.5-flash".to_string(),
        "gemini-2.0-flash".to_string(),
        "gemini-1.5-flash".to_string(),
    ]
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_sampling_window_ms() -> u64 {
    3000
}

fn default_content_excerpt_chars() -> usize {
    1500
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_top_p() -> f32 {
    0.8
}

fn default_top_k() -> u32 {
    40
}

fn default_console_max_entries() -> usize {
    200
}

fn default_capture_window_ms() -> u64 {
    1000
}

/// Our own in-page scripts log with this prefix
fn default_console_exclude_patterns() -> Vec<String> {
    vec![r"^\[page-report\]".to_string()]
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            top_p: default_top_p(),
            top_k: default_top_k(),
        }
    }
}

impl Default for ConsoleCaptureConfig {
    fn default() -> Self {
        Self {
            max_entries: default_console_max_entries(),
            capture_window_ms: default_capture_window_ms(),
            exclude_patterns: default_console_exclude_patterns(),
            include_patterns: Vec::new(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            ai_mode: AiMode::default(),
            api_key: String::new(),
            models: default_models(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            generation: GenerationSettings::default(),
            console: ConsoleCaptureConfig::default(),
            sampling_window_ms: default_sampling_window_ms(),
            content_excerpt_chars: default_content_excerpt_chars(),
            webdriver_url: default_webdriver_url(),
        }
    }
}

impl ReportConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Override fields from `GEMINI_API_KEY` and `WEBDRIVER_URL` when set
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("WEBDRIVER_URL").ok(),
        )
    }

    fn with_overrides(mut self, api_key: Option<String>, webdriver_url: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
        if let Some(url) = webdriver_url.filter(|u| !u.is_empty()) {
            self.webdriver_url = url;
        }
        self
    }

    /// Whether the remote analyzer may be called at all
    pub fn remote_enabled(&self) -> bool {
        self.ai_mode == AiMode::Gemini && !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = ReportConfig::from_json("{}").unwrap();
        assert_eq!(config.ai_mode, AiMode::Gemini);
        assert_eq!(config.models.len(), 3);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.console.max_entries, 200);
        assert_eq!(config.console.exclude_patterns, vec![r"^\[page-report\]".to_string()]);
        assert!(!config.remote_enabled());
    }

    #[test]
    fn test_pattern_mode_never_remote() {
        let config =
            ReportConfig::from_json(r#"{"ai_mode": "pattern", "api_key": "secret"}"#).unwrap();
        assert_eq!(config.ai_mode, AiMode::Pattern);
        assert!(!config.remote_enabled());
    }

    #[test]
    fn test_gemini_mode_with_key_is_remote() {
        let config = ReportConfig::from_json(r#"{"api_key": "secret"}"#).unwrap();
        assert!(config.remote_enabled());
    }

    #[test]
    fn test_overrides_skip_empty_values() {
        let config = ReportConfig::default()
            .with_overrides(Some(String::new()), Some("http://localhost:9515".into()));
        assert!(config.api_key.is_empty());
        assert_eq!(config.webdriver_url, "http://localhost:9515");
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            ReportConfig::from_json(r#"{"ai_mode": "telepathy"}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
