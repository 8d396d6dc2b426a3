//! Metrics-recording status reporter.
//!
//! Sits between the publisher and the front-end reporters. Phase completions and
//! upload timings are derived from the progress stream; failures are recorded
//! by the caller with [`record_failure`] since the publisher never reports a
//! `Failed` progress value.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use strata_publisher::{Operation, Phase, Progress, PublisherError, StatusReporter};
use strata_telemetry::{observe_upload, record_phase_outcome, FLOWS_REJECTED};

#[derive(Default)]
struct PhaseTracker {
    last: Option<Phase>,
    upload_started: Option<Instant>,
}

/// Forwards every event to its sinks and records Prometheus metrics.
pub struct MetricsReporter {
    sinks: Vec<Arc<dyn StatusReporter>>,
    tracker: Mutex<PhaseTracker>,
}

impl MetricsReporter {
    /// Wrap a reporter.
    pub fn new(inner: Arc<dyn StatusReporter>) -> Self {
        Self {
            sinks: vec![inner],
            tracker: Mutex::new(PhaseTracker::default()),
        }
    }

    /// Also forward to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn StatusReporter>) -> Self {
        self.sinks.push(sink);
        self
    }
}

fn completed_operation(phase: Phase) -> Option<Operation> {
    match phase {
        Phase::Encoded => Some(Operation::Encode),
        Phase::Registered => Some(Operation::Register),
        Phase::Uploaded => Some(Operation::Upload),
        Phase::Certified => Some(Operation::Certify),
        _ => None,
    }
}

impl StatusReporter for MetricsReporter {
    fn report_progress(&self, progress: Progress) {
        {
            let mut tracker = self.tracker.lock();
            if progress.phase == Phase::Uploading && progress.percent == 0 {
                tracker.upload_started = Some(Instant::now());
            }
            if tracker.last != Some(progress.phase) {
                if let Some(operation) = completed_operation(progress.phase) {
                    record_phase_outcome(operation.as_str(), "success");
                }
                if progress.phase == Phase::Uploaded {
                    if let Some(started) = tracker.upload_started.take() {
                        observe_upload(started.elapsed());
                    }
                }
            }
            tracker.last = Some(progress.phase);
        }
        for sink in &self.sinks {
            sink.report_progress(progress);
        }
    }

    fn report_status(&self, status: &str) {
        for sink in &self.sinks {
            sink.report_status(status);
        }
    }
}

/// Record a failed or refused operation.
pub fn record_failure(error: &PublisherError) {
    if matches!(error, PublisherError::AlreadyRunning) {
        FLOWS_REJECTED.inc();
        return;
    }
    let phase = error.operation().map(|op| op.as_str()).unwrap_or("retrieval");
    let outcome = if error.is_backend_failure() {
        "failure"
    } else {
        "rejected"
    };
    record_phase_outcome(phase, outcome);
}
