//! Cosmetic progress messages for the caller.
//!
//! Timers race the real run but never gate it: the run's terminal update
//! always wins, and updates from an older invocation token are dropped.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Invocation token of the run that produced the update
    pub token: u64,
    pub message: String,
    /// Set on the run's completion message
    pub terminal: bool,
}

impl StatusUpdate {
    pub fn progress(token: u64, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
            terminal: false,
        }
    }

    pub fn terminal(token: u64, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
            terminal: true,
        }
    }
}

pub trait StatusNotifier: Send + Sync {
    fn notify(&self, update: StatusUpdate);
}

/// Keeps the most recent accepted status message
#[derive(Debug, Default)]
pub struct StatusBoard {
    latest: Mutex<Option<StatusUpdate>>,
}

impl StatusBoard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn latest(&self) -> Option<StatusUpdate> {
        self.latest.lock().ok().and_then(|guard| guard.clone())
    }

    fn accepts(current: Option<&StatusUpdate>, update: &StatusUpdate) -> bool {
        match current {
            None => true,
            Some(current) if update.token < current.token => false,
            Some(current) if update.token == current.token => update.terminal || !current.terminal,
            Some(_) => true,
        }
    }
}

impl StatusNotifier for StatusBoard {
    fn notify(&self, update: StatusUpdate) {
        let Ok(mut latest) = self.latest.lock() else {
            return;
        };

        if Self::accepts(latest.as_ref(), &update) {
            ::log::info!("[status #{}] {}", update.token, update.message);
            *latest = Some(update);
        } else {
            ::log::debug!("Dropping stale status for run #{}: {}", update.token, update.message);
        }
    }
}

/// Default escalation schedule for a run
pub fn default_schedule(analysis_type: Option<&str>) -> Vec<(Duration, String)> {
    let subject = analysis_type.unwrap_or("page");
    vec![
        (Duration::from_secs(3), format!("Analyzing {}...", subject)),
        (
            Duration::from_secs(30),
            format!("Still analyzing {}; the model is taking longer than usual", subject),
        ),
        (
            Duration::from_secs(120),
            format!("Analysis of {} is taking unusually long, waiting for it to finish", subject),
        ),
    ]
}

/// Escalating status messages for one run. Dropping the value cancels them.
pub struct ProgressTimers {
    handle: JoinHandle<()>,
}

impl ProgressTimers {
    pub fn start(notifier: Arc<dyn StatusNotifier>, token: u64, analysis_type: Option<&str>) -> Self {
        Self::with_schedule(notifier, token, default_schedule(analysis_type))
    }

    /// Offsets in `schedule` are measured from the start of the run
    pub fn with_schedule(
        notifier: Arc<dyn StatusNotifier>,
        token: u64,
        schedule: Vec<(Duration, String)>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            for (offset, message) in schedule {
                tokio::time::sleep_until(started + offset).await;
                notifier.notify(StatusUpdate::progress(token, message));
            }
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ProgressTimers {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
