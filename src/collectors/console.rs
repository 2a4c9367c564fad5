use crate::config::ConsoleCaptureConfig;
use crate::filter::ConsoleFilter;
use crate::page::{PageContext, PageError};
use crate::runtime::PipelineRuntimeState;
use crate::snapshot::ConsoleEntry;
use serde_json::{Value, json};
use std::time::Duration;

/// Installs the console wrapper. Returns "installed" or "present".
///
/// Every level chains to the original method. Arguments are rendered at call
/// time. Only a reference back to an ancestor becomes "[Circular]"; shared
/// siblings serialize in full. Values JSON.stringify skips (symbols) fall
/// back to `String(value)` and anything it rejects becomes "[Unserializable]".
/// Uncaught errors and unhandled rejections are recorded at `error` level.
const INSTALL_SCRIPT: &str = r#"
const maxEntries = arguments[0];
if (window.__pageReportConsole) {
    window.__pageReportConsole.maxEntries = maxEntries;
    return 'present';
}
const store = { entries: [], maxEntries: maxEntries };
window.__pageReportConsole = store;

function render(value) {
    if (typeof value === 'string') return value;
    if (value instanceof Error) return value.name + ': ' + value.message;
    if (value === undefined) return 'undefined';
    if (typeof value === 'function') return '[Function ' + (value.name || 'anonymous') + ']';
    try {
        const ancestors = [];
        const text = JSON.stringify(value, function (key, v) {
            if (typeof v !== 'object' || v === null) return v;
            while (ancestors.length > 0 && ancestors[ancestors.length - 1] !== this) ancestors.pop();
            if (ancestors.indexOf(v) !== -1) return '[Circular]';
            ancestors.push(v);
            return v;
        });
        return text === undefined ? String(value) : text;
    } catch (e) {
        return '[Unserializable]';
    }
}

function record(level, args) {
    try {
        store.entries.push({
            level: level,
            renderedArgs: Array.prototype.map.call(args, render),
            timestamp: new Date().toISOString()
        });
        while (store.entries.length > store.maxEntries) store.entries.shift();
    } catch (e) {}
}

['log', 'info', 'warn', 'error', 'debug'].forEach(function (level) {
    const original = console[level];
    console[level] = function () {
        record(level, arguments);
        if (typeof original === 'function') return original.apply(console, arguments);
    };
});

window.addEventListener('error', function (event) {
    record('error', ['Uncaught ' + (event.error ? render(event.error) : event.message)]);
});
window.addEventListener('unhandledrejection', function (event) {
    record('error', ['Unhandled rejection: ' + render(event.reason)]);
});

console.debug('[page-report] console hook installed');
return 'installed';
"#;

const READ_SCRIPT: &str =
    "return window.__pageReportConsole ? window.__pageReportConsole.entries.slice() : [];";

/// Captures console output of the page through an in-page hook
#[derive(Debug)]
pub struct ConsoleCollector {
    filter: ConsoleFilter,
    max_entries: usize,
    capture_window: Duration,
}

impl ConsoleCollector {
    pub fn new(config: &ConsoleCaptureConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            filter: ConsoleFilter::from_config(config)?,
            max_entries: config.max_entries,
            capture_window: Duration::from_millis(config.capture_window_ms),
        })
    }

    /// Install the hook at most once per page lifetime.
    ///
    /// Returns `true` only when this call wrapped the console. A hook
    /// recorded in `state`, or one the page already carries, is left alone.
    pub async fn install(
        &self,
        page: &dyn PageContext,
        state: &PipelineRuntimeState,
    ) -> Result<bool, PageError> {
        if state.console_hook_installed() {
            ::log::trace!("Console hook already installed, skipping");
            return Ok(false);
        }

        let outcome = page
            .execute(INSTALL_SCRIPT, vec![json!(self.max_entries)])
            .await?;
        state.mark_console_hook_installed();

        let installed = outcome.as_str() == Some("installed");
        ::log::debug!(
            "Console hook {}",
            if installed { "installed" } else { "was already present" }
        );
        Ok(installed)
    }

    /// Read the captured entries after the capture window has elapsed
    pub async fn collect(&self, page: &dyn PageContext) -> Vec<ConsoleEntry> {
        if !self.capture_window.is_zero() {
            tokio::time::sleep(self.capture_window).await;
        }

        match self.read_entries(page).await {
            Ok(entries) => entries,
            Err(e) => {
                ::log::warn!("Console collection partial failure: {}", e);
                Vec::new()
            }
        }
    }

    async fn read_entries(&self, page: &dyn PageContext) -> Result<Vec<ConsoleEntry>, PageError> {
        let raw = page.execute(READ_SCRIPT, vec![]).await?;
        Ok(self.decode_entries(raw))
    }

    /// Decode raw entries, dropping malformed ones, filtered and capped to the newest
    pub fn decode_entries(&self, raw: Value) -> Vec<ConsoleEntry> {
        let Value::Array(items) = raw else {
            return Vec::new();
        };

        let mut entries: Vec<ConsoleEntry> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<ConsoleEntry>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    ::log::debug!("Skipping malformed console entry: {}", e);
                    None
                }
            })
            .filter(|entry| self.filter.should_keep(entry))
            .collect();

        if entries.len() > self.max_entries {
            entries.drain(..entries.len() - self.max_entries);
        }
        entries
    }
}

/// Render an argument the way the in-page hook does
pub fn render_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
