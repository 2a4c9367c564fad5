use clap::{Parser, ValueEnum};
use page_report::AiMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-report")]
#[command(about = "Diagnose a web page and print a structured bug report")]
#[command(version)]
pub struct Args {
    /// Page to open and analyze
    pub url: String,

    /// Analysis backend (overrides the config file)
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Gemini API key (falls back to GEMINI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Free-form tag used in progress messages
    #[arg(long)]
    pub analysis_type: Option<String>,

    /// Print the raw `bugReportData` message instead of the report text
    #[arg(long)]
    pub json: bool,

    /// Performance sampling window in milliseconds
    #[arg(long)]
    pub sampling_window: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Gemini,
    Pattern,
}

impl From<ModeArg> for AiMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Gemini => AiMode::Gemini,
            ModeArg::Pattern => AiMode::Pattern,
        }
    }
}
