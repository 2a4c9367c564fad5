// Re-export modules
pub mod analyzer;
pub mod classifier;
pub mod collectors;
pub mod config;
pub mod filter;
pub mod page;
pub mod pipeline;
pub mod report;
pub mod results;
pub mod runtime;
pub mod snapshot;
pub mod status;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use config::{AiMode, ReportConfig};
pub use page::{PageContext, PageError, WebDriverPage};
pub use pipeline::{ChannelSink, Pipeline, ReportSink, RunOutcome, StdoutSink};
pub use results::{AnalysisResult, ReportMessage};
pub use snapshot::PageSnapshot;
