//! # One-Click Driver
//!
//! Chains all four phases with a single call and one consolidated status
//! line. No automatic retry.

use std::sync::Arc;

use crate::domain::{CertifyOutcome, FlowFailure, FlowRequest, PublisherError};
use crate::ports::{LedgerBackend, PublicationApi, StorageBackend};

use super::publication::PublicationService;

/// Consolidated status line for a failed flow.
pub fn failure_message(error: &PublisherError) -> String {
    match error.operation() {
        Some(operation) => format!("One-click flow failed during {operation}: {error}"),
        None => format!("One-click flow failed: {error}"),
    }
}

/// One-click orchestration over a shared publication service.
pub struct OneClickDriver<S: ?Sized = dyn StorageBackend, L: ?Sized = dyn LedgerBackend> {
    service: Arc<PublicationService<S, L>>,
}

impl<S, L> OneClickDriver<S, L>
where
    S: StorageBackend + ?Sized + 'static,
    L: LedgerBackend + ?Sized + 'static,
{
    /// Wrap a publication service.
    pub fn new(service: Arc<PublicationService<S, L>>) -> Self {
        Self { service }
    }

    /// Underlying service, for phase-level retries after a failure.
    pub fn service(&self) -> &Arc<PublicationService<S, L>> {
        &self.service
    }

    /// Whether a flow is running.
    pub fn is_running(&self) -> bool {
        self.service.is_flow_running()
    }

    /// Run the full flow.
    pub async fn run(&self, request: FlowRequest) -> Result<CertifyOutcome, FlowFailure> {
        let reporter = Arc::clone(self.service.reporter());
        match self.service.run_full_flow(request).await {
            Ok(outcome) => {
                reporter.report_status("One-click flow complete");
                Ok(outcome)
            }
            Err(failure) => {
                let message = failure_message(&failure.error);
                tracing::warn!("[strata] {}", message);
                if !matches!(failure.error, PublisherError::AlreadyRunning) {
                    reporter.report_status(&message);
                }
                Err(failure)
            }
        }
    }
}
