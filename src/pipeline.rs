use crate::analyzer::RemoteAnalyzer;
use crate::classifier;
use crate::collectors::Collectors;
use crate::config::ReportConfig;
use crate::page::{PageContext, PageError};
use crate::report;
use crate::results::{AnalysisResult, ReportMessage};
use crate::runtime::{AnalysisStep, PipelineRuntimeState, PipelineState};
use crate::snapshot::PageSnapshot;
use crate::status::{ProgressTimers, StatusBoard, StatusNotifier, StatusUpdate};
use crate::utils::iso_timestamp;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("report channel closed")]
    ChannelClosed,

    #[error("failed to encode report message: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid console filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("page collection failed: {0}")]
    Collection(#[from] PageError),
}

/// Outbound transport for finished reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, message: ReportMessage) -> Result<(), DeliveryError>;
}

/// Delivers reports into a tokio channel
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ReportMessage>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReportMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ReportSink for ChannelSink {
    async fn deliver(&self, message: ReportMessage) -> Result<(), DeliveryError> {
        self.sender
            .send(message)
            .map_err(|_| DeliveryError::ChannelClosed)
    }
}

/// Prints reports to stdout, either as text or as the raw JSON message
pub struct StdoutSink {
    json: bool,
}

impl StdoutSink {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

#[async_trait]
impl ReportSink for StdoutSink {
    async fn deliver(&self, message: ReportMessage) -> Result<(), DeliveryError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&message)?);
        } else {
            println!("{}", message.report);
        }
        Ok(())
    }
}

/// How a trigger ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A full report was delivered
    Delivered,
    /// Collection failed and a minimal failure report was delivered
    DeliveredWithError,
    /// Another run was already in flight; nothing happened
    Rejected,
}

/// Collect, analyze, synthesize and deliver one report per trigger
pub struct Pipeline {
    config: ReportConfig,
    collectors: Collectors,
    analyzer: Option<RemoteAnalyzer>,
    sink: Arc<dyn ReportSink>,
    state: Arc<PipelineRuntimeState>,
    notifier: Arc<dyn StatusNotifier>,
}

impl Pipeline {
    /// Create a pipeline with the default collectors and, when the
    /// configuration allows it, a Gemini-backed remote analyzer
    pub fn new(config: ReportConfig, sink: Arc<dyn ReportSink>) -> Result<Self, PipelineError> {
        let collectors = Collectors::from_config(&config)?;
        let analyzer = config
            .remote_enabled()
            .then(|| RemoteAnalyzer::from_config(&config));

        Ok(Self {
            config,
            collectors,
            analyzer,
            sink,
            state: PipelineRuntimeState::new(),
            notifier: StatusBoard::new(),
        })
    }

    /// Share runtime state with other pipelines driving the same page
    pub fn with_state(mut self, state: Arc<PipelineRuntimeState>) -> Self {
        self.state = state;
        self
    }

    /// Replace the remote analyzer. It is still only used when remote analysis is enabled.
    pub fn with_analyzer(mut self, analyzer: RemoteAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_collectors(mut self, collectors: Collectors) -> Self {
        self.collectors = collectors;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn StatusNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn state(&self) -> &Arc<PipelineRuntimeState> {
        &self.state
    }

    /// Run the pipeline once against `page`.
    ///
    /// `analysis_type` only changes the wording of status messages. A trigger
    /// that arrives while another run is in flight is rejected, not queued.
    pub async fn trigger(&self, page: &dyn PageContext, analysis_type: Option<&str>) -> RunOutcome {
        let Some(guard) = self.state.try_begin() else {
            ::log::info!("Report already in progress, ignoring trigger");
            return RunOutcome::Rejected;
        };
        let token = guard.token();

        ::log::info!("Starting report run #{}", token);
        self.notifier
            .notify(StatusUpdate::progress(token, "Collecting page data..."));
        let timers = ProgressTimers::start(Arc::clone(&self.notifier), token, analysis_type);

        let (report, outcome) = match self.run(page).await {
            Ok(report) => (report, RunOutcome::Delivered),
            Err(e) => {
                ::log::error!("Report run #{} failed: {}", token, e);
                let url = page.current_url().await.unwrap_or_default();
                let report = report::synthesize_failure(&e.to_string(), &url, &iso_timestamp());
                (report, RunOutcome::DeliveredWithError)
            }
        };

        timers.cancel();

        if let Err(e) = self.sink.deliver(ReportMessage::new(report)).await {
            ::log::error!("Failed to deliver report for run #{}: {}", token, e);
        }

        let (state, message) = match outcome {
            RunOutcome::DeliveredWithError => (PipelineState::DeliveredWithError, "Report ready (analysis failed)"),
            _ => (PipelineState::Delivered, "Report ready"),
        };
        self.state.set_state(state);
        self.notifier.notify(StatusUpdate::terminal(token, message));

        drop(guard);
        outcome
    }

    async fn run(&self, page: &dyn PageContext) -> Result<String, PipelineError> {
        self.state.set_state(PipelineState::Collecting);
        self.collectors.prepare(page, &self.state).await;
        let snapshot = self.collectors.snapshot(page).await?;

        let analysis = self.analyze(&snapshot).await;

        self.state.set_state(PipelineState::Synthesizing);
        Ok(report::synthesize(&snapshot, &analysis))
    }

    /// Remote analysis when enabled, otherwise or on exhaustion the pattern classifier
    async fn analyze(&self, snapshot: &PageSnapshot) -> AnalysisResult {
        match &self.analyzer {
            Some(analyzer) if self.config.remote_enabled() => {
                self.state
                    .set_state(PipelineState::Analyzing(AnalysisStep::TryRemote));
                match analyzer.analyze(snapshot).await {
                    Ok(ai) => return AnalysisResult::Ai(ai),
                    Err(e) => ::log::warn!("Remote analysis unavailable, using pattern analysis: {}", e),
                }
            }
            _ => ::log::debug!("Remote analysis disabled, using pattern analysis"),
        }

        self.state
            .set_state(PipelineState::Analyzing(AnalysisStep::FallbackHeuristic));
        AnalysisResult::Heuristic(classifier::classify(snapshot))
    }
}
