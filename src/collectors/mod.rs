pub mod console;
pub mod dom;
pub mod framework;
pub mod performance;

pub use console::ConsoleCollector;
pub use dom::{DomCollector, DomScan};
pub use framework::{FrameworkDetector, FrameworkProbe, ScriptProbe};
pub use performance::PerformanceSampler;

use crate::config::ReportConfig;
use crate::page::{PageContext, PageError};
use crate::runtime::PipelineRuntimeState;
use crate::snapshot::PageSnapshot;
use crate::utils::iso_timestamp;
use std::time::Duration;

/// The full set of collectors used to build a snapshot
pub struct Collectors {
    pub console: ConsoleCollector,
    pub dom: DomCollector,
    pub performance: PerformanceSampler,
    pub framework: FrameworkDetector,
}

impl Collectors {
    /// Build the default collectors from configuration
    pub fn from_config(config: &ReportConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            console: ConsoleCollector::new(&config.console)?,
            dom: DomCollector::new(config.content_excerpt_chars),
            performance: PerformanceSampler::new(Duration::from_millis(config.sampling_window_ms)),
            framework: FrameworkDetector::default(),
        })
    }

    /// Replace the framework detector, e.g. with a custom probe list
    pub fn with_framework_detector(mut self, detector: FrameworkDetector) -> Self {
        self.framework = detector;
        self
    }

    /// Make sure the console hook is in place. Failures are logged, not raised.
    pub async fn prepare(&self, page: &dyn PageContext, state: &PipelineRuntimeState) {
        if let Err(e) = self.console.install(page, state).await {
            ::log::warn!("Console hook could not be installed: {}", e);
        }
    }

    /// Run every collector and freeze the results into a snapshot.
    ///
    /// Only an unreachable page (no URL) is an error; every other collector
    /// degrades to its neutral value.
    pub async fn snapshot(&self, page: &dyn PageContext) -> Result<PageSnapshot, PageError> {
        let url = page.current_url().await?;
        let title = page.title().await.unwrap_or_else(|e| {
            ::log::warn!("Title collection partial failure: {}", e);
            String::new()
        });
        let timestamp = iso_timestamp();

        // The sampler's window and the console capture window overlap
        let (performance, console_entries) = tokio::join!(
            self.performance.collect(page),
            self.console.collect(page),
        );
        let dom = self.dom.collect(page).await;
        let framework = self.framework.collect(page).await;

        ::log::info!(
            "Collected snapshot for {}: {} console entries, {} DOM issues",
            url,
            console_entries.len(),
            dom.issues.len()
        );

        Ok(PageSnapshot {
            url,
            title,
            content_excerpt: dom.content_excerpt,
            console_entries,
            dom_issues: dom.issues,
            performance_snapshot: performance,
            framework_snapshot: Some(framework),
            timestamp,
        })
    }
}
