use thiserror::Error;

/// Why one model attempt failed. Every variant lets the next model be tried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        AttemptError::Transport(err.without_url().to_string())
    }
}

/// A failed attempt against a specific model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAttemptFailure {
    pub model: String,
    pub error: AttemptError,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error("no models configured")]
    NoModelsConfigured,

    #[error("all {} models failed", attempts.len())]
    AllModelsExhausted { attempts: Vec<ModelAttemptFailure> },
}
