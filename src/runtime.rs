use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Where a pipeline run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Collecting,
    Analyzing(AnalysisStep),
    Synthesizing,
    Delivered,
    DeliveredWithError,
}

/// Sub-state of `Analyzing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStep {
    TryRemote,
    FallbackHeuristic,
}

/// Process-wide state shared by every pipeline run against one page.
///
/// Created on first use and kept for the life of the page. Holds the
/// re-entrancy flag, the invocation counter that tags status updates, and
/// whether the console hook has been installed.
#[derive(Debug)]
pub struct PipelineRuntimeState {
    in_flight: AtomicBool,
    invocations: AtomicU64,
    console_hook_installed: AtomicBool,
    state: Mutex<PipelineState>,
}

impl Default for PipelineRuntimeState {
    fn default() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            invocations: AtomicU64::new(0),
            console_hook_installed: AtomicBool::new(false),
            state: Mutex::new(PipelineState::Idle),
        }
    }
}

impl PipelineRuntimeState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the run slot. Returns `None` while another run holds it.
    pub fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let token = self.invocations.fetch_add(1, Ordering::AcqRel) + 1;
        Some(RunGuard {
            state: Arc::clone(self),
            token,
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Token of the most recent run
    pub fn latest_token(&self) -> u64 {
        self.invocations.load(Ordering::Acquire)
    }

    pub fn console_hook_installed(&self) -> bool {
        self.console_hook_installed.load(Ordering::Acquire)
    }

    pub fn mark_console_hook_installed(&self) {
        self.console_hook_installed.store(true, Ordering::Release);
    }

    pub fn current_state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_state(&self, next: PipelineState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        ::log::debug!("Pipeline state {:?} -> {:?}", *state, next);
        *state = next;
    }

    /// Forget everything, as if the page had just loaded
    pub fn reset(&self) {
        self.in_flight.store(false, Ordering::Release);
        self.invocations.store(0, Ordering::Release);
        self.console_hook_installed.store(false, Ordering::Release);
        self.set_state(PipelineState::Idle);
    }
}

/// Holds the run slot; releases it on drop
#[derive(Debug)]
pub struct RunGuard {
    state: Arc<PipelineRuntimeState>,
    token: u64,
}

impl RunGuard {
    /// Invocation token of this run
    pub fn token(&self) -> u64 {
        self.token
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.in_flight.store(false, Ordering::Release);
    }
}
