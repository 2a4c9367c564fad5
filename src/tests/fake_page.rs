//! In-memory page used by collector and pipeline tests.
//!
//! Recognizes the console hook's install and read scripts and emulates the
//! in-page hook; any other script is answered from substring-matched canned
//! results, or `null`.

use crate::collectors::console::render_arg;
use crate::page::{PageContext, PageError};
use crate::snapshot::ConsoleLevel;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const INSTALL_MARKER: &str = "window.__pageReportConsole = store";
const READ_MARKER: &str = "entries.slice()";

#[derive(Debug, Default)]
struct ConsoleHook {
    /// Number of wrappers stacked on each console method
    depth: usize,
    max_entries: usize,
    entries: Vec<Value>,
}

impl ConsoleHook {
    fn record(&mut self, level: &str, args: &[Value]) {
        let rendered: Vec<String> = args.iter().map(render_arg).collect();
        for _ in 0..self.depth {
            self.entries.push(json!({
                "level": level,
                "renderedArgs": rendered,
                "timestamp": "2024-01-01T00:00:00.000Z",
            }));
        }
        let excess = self.entries.len().saturating_sub(self.max_entries);
        self.entries.drain(..excess);
    }
}

pub struct FakePage {
    url: Option<String>,
    title: Option<String>,
    source: String,
    script_results: Vec<(String, Value)>,
    performance: Value,
    /// The async sampler script never calls back
    stalled: bool,
    console: Mutex<ConsoleHook>,
    install_runs: AtomicUsize,
}

impl FakePage {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            title: Some(title.to_string()),
            source: format!("<html><head><title>{}</title></head><body></body></html>", title),
            script_results: Vec::new(),
            performance: json!({}),
            stalled: false,
            console: Mutex::new(ConsoleHook::default()),
            install_runs: AtomicUsize::new(0),
        }
    }

    /// Answer any script containing `needle` with `result`
    pub fn with_script_result(mut self, needle: &str, result: Value) -> Self {
        self.script_results.push((needle.to_string(), result));
        self
    }

    pub fn with_source(mut self, html: &str) -> Self {
        self.source = html.to_string();
        self
    }

    /// Raw sample returned by the performance sampler script
    pub fn with_performance(mut self, sample: Value) -> Self {
        self.performance = sample;
        self
    }

    /// The performance sampler script hangs forever
    pub fn with_stalled_sampler(mut self) -> Self {
        self.stalled = true;
        self
    }

    /// Every URL lookup fails, as on a page that went away
    pub fn without_url(mut self) -> Self {
        self.url = None;
        self
    }

    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    /// Call `console[level](...args)` inside the page
    pub fn log(&self, level: ConsoleLevel, args: &[Value]) {
        self.console
            .lock()
            .unwrap()
            .record(level.as_str(), args);
    }

    /// How many times the install script actually ran
    pub fn install_runs(&self) -> usize {
        self.install_runs.load(Ordering::SeqCst)
    }

    pub fn hook_depth(&self) -> usize {
        self.console.lock().unwrap().depth
    }

    fn install(&self, args: &[Value]) -> Value {
        self.install_runs.fetch_add(1, Ordering::SeqCst);
        let mut hook = self.console.lock().unwrap();
        hook.max_entries = args.first().and_then(Value::as_u64).unwrap_or(200) as usize;
        if hook.depth > 0 {
            return json!("present");
        }
        hook.depth = 1;
        hook.record("debug", &[json!("[page-report] console hook installed")]);
        json!("installed")
    }
}

#[async_trait]
impl PageContext for FakePage {
    async fn current_url(&self) -> Result<String, PageError> {
        tokio::task::yield_now().await;
        self.url
            .clone()
            .ok_or_else(|| PageError::Command("no such window".to_string()))
    }

    async fn title(&self) -> Result<String, PageError> {
        tokio::task::yield_now().await;
        self.title
            .clone()
            .ok_or_else(|| PageError::Command("stale element reference".to_string()))
    }

    async fn source(&self) -> Result<String, PageError> {
        tokio::task::yield_now().await;
        Ok(self.source.clone())
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, PageError> {
        tokio::task::yield_now().await;
        if script.contains(INSTALL_MARKER) {
            return Ok(self.install(&args));
        }
        if script.contains(READ_MARKER) {
            let hook = self.console.lock().unwrap();
            return Ok(Value::Array(hook.entries.clone()));
        }

        Ok(self
            .script_results
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or(Value::Null))
    }

    async fn execute_async(&self, _script: &str, _args: Vec<Value>) -> Result<Value, PageError> {
        tokio::task::yield_now().await;
        if self.stalled {
            std::future::pending::<()>().await;
        }
        Ok(self.performance.clone())
    }
}
