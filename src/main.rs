use clap::Parser;
use page_report::{Pipeline, ReportConfig, RunOutcome, StdoutSink, WebDriverPage};
use std::process::ExitCode;
use std::sync::Arc;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!("Generating report for {} ({:?} mode)", args.url, config.ai_mode);

    let page = match WebDriverPage::connect(&config.webdriver_url).await {
        Ok(page) => page,
        Err(e) => {
            ::log::error!("{}", e);
            eprintln!("Note: page-report requires a WebDriver server (e.g., ChromeDriver).");
            eprintln!("Set WEBDRIVER_URL if not using the default {}", config.webdriver_url);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::new(config, Arc::new(StdoutSink::new(args.json))) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            ::log::error!("Failed to build pipeline: {}", e);
            close(page).await;
            return ExitCode::FAILURE;
        }
    };

    let outcome = match page.goto(&args.url).await {
        Ok(()) => pipeline.trigger(&page, args.analysis_type.as_deref()).await,
        Err(e) => {
            ::log::error!("Failed to open {}: {}", args.url, e);
            close(page).await;
            return ExitCode::FAILURE;
        }
    };

    close(page).await;

    match outcome {
        RunOutcome::Delivered => ExitCode::SUCCESS,
        RunOutcome::DeliveredWithError | RunOutcome::Rejected => ExitCode::FAILURE,
    }
}

/// Config file (or defaults), then environment, then command-line flags
fn load_config(args: &Args) -> Result<ReportConfig, page_report::config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => ReportConfig::from_file(path)?,
        None => ReportConfig::default(),
    }
    .with_env_overrides();

    if let Some(mode) = args.mode {
        config.ai_mode = mode.into();
    }
    if let Some(key) = &args.api_key {
        config.api_key = key.clone();
    }
    if let Some(window) = args.sampling_window {
        config.sampling_window_ms = window;
    }
    Ok(config)
}

async fn close(page: WebDriverPage) {
    if let Err(e) = page.close().await {
        ::log::warn!("Failed to close WebDriver session: {}", e);
    }
}
