pub mod webdriver;

pub use webdriver::WebDriverPage;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to connect to WebDriver: {0}")]
    Connect(String),

    #[error("browser command failed: {0}")]
    Command(String),

    #[error("unexpected script result: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timed out after {0} ms")]
    Timeout(u64),
}

/// The live page a report is generated for.
///
/// Scripts follow WebDriver conventions: the body is a function body, the
/// value of `return` comes back as JSON, and for `execute_async` the last
/// argument is the completion callback.
#[async_trait]
pub trait PageContext: Send + Sync {
    async fn current_url(&self) -> Result<String, PageError>;

    async fn title(&self) -> Result<String, PageError>;

    /// Serialized DOM of the current document
    async fn source(&self) -> Result<String, PageError>;

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, PageError>;

    async fn execute_async(&self, script: &str, args: Vec<Value>) -> Result<Value, PageError>;
}
