//! Status Reporter Adapters
//!
//! `WatchStatusReporter` exposes progress and status as observable value
//! streams; `TracingStatusReporter` logs every event.

use crate::domain::Progress;
use crate::ports::StatusReporter;
use tokio::sync::watch;
use tracing::{debug, info};

/// Reporter backed by `watch` channels. Subscribers always see the latest
/// value; intermediate updates may be coalesced.
#[derive(Debug)]
pub struct WatchStatusReporter {
    progress: watch::Sender<Progress>,
    status: watch::Sender<String>,
}

impl WatchStatusReporter {
    /// Create a reporter starting at `Idle 0%` with an empty status.
    pub fn new() -> Self {
        let (progress, _) = watch::channel(Progress::default());
        let (status, _) = watch::channel(String::new());
        Self { progress, status }
    }

    /// Subscribe to progress updates.
    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Subscribe to status lines.
    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    /// Latest progress.
    pub fn current_progress(&self) -> Progress {
        *self.progress.borrow()
    }

    /// Latest status line.
    pub fn current_status(&self) -> String {
        self.status.borrow().clone()
    }
}

impl Default for WatchStatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for WatchStatusReporter {
    fn report_progress(&self, progress: Progress) {
        // send_replace keeps the value even with no subscribers.
        self.progress.send_replace(progress);
    }

    fn report_status(&self, status: &str) {
        self.status.send_replace(status.to_string());
    }
}

/// Reporter that writes every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusReporter;

impl StatusReporter for TracingStatusReporter {
    fn report_progress(&self, progress: Progress) {
        debug!(
            phase = %progress.phase,
            percent = progress.percent,
            "[strata] progress"
        );
    }

    fn report_status(&self, status: &str) {
        info!("[strata] {}", status);
    }
}
