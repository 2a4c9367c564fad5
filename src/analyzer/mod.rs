pub mod error;
pub mod gemini;
pub mod parse;
pub mod prompt;

pub use error::{AnalyzerError, AttemptError, ModelAttemptFailure};
pub use gemini::{GeminiTransport, GenerateContentRequest, GenerationConfig};

use crate::config::ReportConfig;
use crate::results::AiAnalysis;
use crate::snapshot::PageSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Sends one request to one model and returns the raw answer text
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> Result<String, AttemptError>;
}

/// Asks a priority-ordered list of models for an analysis, one at a time
pub struct RemoteAnalyzer {
    transport: Arc<dyn ModelTransport>,
    models: Vec<String>,
    generation: GenerationConfig,
}

impl RemoteAnalyzer {
    pub fn new(transport: Arc<dyn ModelTransport>, models: Vec<String>, generation: GenerationConfig) -> Self {
        Self {
            transport,
            models,
            generation,
        }
    }

    /// Analyzer talking to the configured Gemini endpoint
    pub fn from_config(config: &ReportConfig) -> Self {
        let transport = GeminiTransport::new(
            &config.api_base_url,
            &config.api_key,
            Duration::from_secs(config.request_timeout_secs),
        );
        Self::with_transport(config, Arc::new(transport))
    }

    /// Analyzer using the configured models and sampling with another transport
    pub fn with_transport(config: &ReportConfig, transport: Arc<dyn ModelTransport>) -> Self {
        Self::new(
            transport,
            config.models.clone(),
            GenerationConfig::from(&config.generation),
        )
    }

    /// Try each model in order; fails only when every model has failed
    pub async fn analyze(&self, snapshot: &PageSnapshot) -> Result<AiAnalysis, AnalyzerError> {
        if self.models.is_empty() {
            return Err(AnalyzerError::NoModelsConfigured);
        }

        let request = GenerateContentRequest::new(prompt::build_prompt(snapshot), self.generation.clone());
        let mut attempts = Vec::new();

        // One model at a time; latency is bounded by the sum of per-call timeouts
        for model in &self.models {
            match self.transport.generate(model, &request).await {
                Ok(text) => {
                    ::log::info!("Model {} answered ({} chars)", model, text.len());
                    return Ok(parse::interpret(&text));
                }
                Err(error) => {
                    ::log::warn!("Model {} failed: {}", model, error);
                    attempts.push(ModelAttemptFailure {
                        model: model.clone(),
                        error,
                    });
                }
            }
        }

        Err(AnalyzerError::AllModelsExhausted { attempts })
    }
}
