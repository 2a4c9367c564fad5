//! Wire types and HTTP transport for the Gemini `generateContent` endpoint.

use super::error::AttemptError;
use super::ModelTransport;
use crate::config::GenerationSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl From<&GenerationSettings> for GenerationConfig {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
            top_p: settings.top_p,
            top_k: settings.top_k,
        }
    }
}

/// Request body for `generateContent`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// A single-turn request carrying `prompt`
    pub fn new(prompt: impl Into<String>, generation_config: GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt.into() }],
            }],
            generation_config,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Pull `candidates[0].content.parts[0].text` out of a response body
pub fn extract_text(body: &str) -> Result<String, AttemptError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AttemptError::MalformedPayload(format!("invalid response JSON: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| AttemptError::MalformedPayload("no candidates[0].content.parts[0].text".to_string()))?;

    if text.trim().is_empty() {
        return Err(AttemptError::EmptyResponse);
    }
    Ok(text)
}

/// Header carrying the API key, so it never appears in a URL
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Sends requests to `{base_url}/models/{model}:generateContent`
pub struct GeminiTransport {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiTransport {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ModelTransport for GeminiTransport {
    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> Result<String, AttemptError> {
        ::log::debug!("Gemini generate_content: model={}", model);

        let response = self
            .client
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AttemptError::Http {
                status: status.as_u16(),
                body,
            });
        }

        extract_text(&body)
    }
}
