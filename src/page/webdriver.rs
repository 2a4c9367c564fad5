use super::{PageContext, PageError};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::Value;

/// Common local driver endpoints tried after the configured one
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// A page driven through a WebDriver session
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    /// Wrap an existing session
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects to the WebDriver instance, trying common local endpoints if the
    /// configured one is unreachable
    pub async fn connect(webdriver_url: &str) -> Result<Self, PageError> {
        match ClientBuilder::native().connect(webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", webdriver_url);
                return Ok(Self::new(client));
            }
            Err(e) => {
                ::log::warn!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            }
        }

        for url in FALLBACK_WEBDRIVER_URLS.iter() {
            if *url == webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = ClientBuilder::native().connect(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(Self::new(client));
            }
        }

        Err(PageError::Connect(format!(
            "no WebDriver server reachable at {} or the common local ports; \
             start one or set WEBDRIVER_URL",
            webdriver_url
        )))
    }

    /// Navigate the session to `url`
    pub async fn goto(&self, url: &str) -> Result<(), PageError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| PageError::Command(format!("navigating to {}: {}", url, e)))
    }

    /// End the WebDriver session
    pub async fn close(self) -> Result<(), PageError> {
        self.client
            .close()
            .await
            .map_err(|e| PageError::Command(e.to_string()))
    }
}

fn command_error(context: &str, error: fantoccini::error::CmdError) -> PageError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while {}", context);
    }
    PageError::Command(format!("{}: {}", context, error))
}

#[async_trait]
impl PageContext for WebDriverPage {
    async fn current_url(&self) -> Result<String, PageError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(|e| command_error("reading current URL", e))
    }

    async fn title(&self) -> Result<String, PageError> {
        self.client
            .title()
            .await
            .map_err(|e| command_error("reading title", e))
    }

    async fn source(&self) -> Result<String, PageError> {
        self.client
            .source()
            .await
            .map_err(|e| command_error("getting page source", e))
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, PageError> {
        self.client
            .execute(script, args)
            .await
            .map_err(|e| command_error("executing script", e))
    }

    async fn execute_async(&self, script: &str, args: Vec<Value>) -> Result<Value, PageError> {
        self.client
            .execute_async(script, args)
            .await
            .map_err(|e| command_error("executing async script", e))
    }
}
