//! # Publication Service
//!
//! Drives one file through encode, register, upload and certify against a
//! storage backend and a ledger backend.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::PublisherConfig;
use crate::domain::{
    invariant_digest_match, invariant_input_size, invariant_sufficient_funds, AccountAddress,
    BackendError, CancellationSignal, CertifyOutcome, FlowFailure, FlowRequest, Operation, Phase,
    Progress, PublicationSession, PublisherError, SourceObject, TxDigest,
};
use crate::ports::{LedgerBackend, PublicationApi, StatusReporter, StorageBackend};

/// Publication Service - the publication state machine.
///
/// Stateless apart from the full-flow guard; sessions are owned by callers.
pub struct PublicationService<S: ?Sized = dyn StorageBackend, L: ?Sized = dyn LedgerBackend> {
    /// Configuration.
    config: PublisherConfig,
    /// Storage-node backend.
    storage: Arc<S>,
    /// Ledger backend.
    ledger: Arc<L>,
    /// Progress and status sink.
    reporter: Arc<dyn StatusReporter>,
    /// Set while a full flow runs.
    flow_running: AtomicBool,
}

/// Clears the full-flow flag on drop, including when the flow future is
/// dropped mid-way.
struct FlowGuard<'a>(&'a AtomicBool);

impl<'a> FlowGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn missing_handle() -> BackendError {
    BackendError::Failed("session has no encoded handle".to_string())
}

impl<S, L> PublicationService<S, L>
where
    S: StorageBackend + ?Sized,
    L: LedgerBackend + ?Sized,
{
    /// Create a new publication service.
    pub fn new(
        config: PublisherConfig,
        storage: Arc<S>,
        ledger: Arc<L>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            config,
            storage,
            ledger,
            reporter,
            flow_running: AtomicBool::new(false),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Status sink shared with callers.
    pub fn reporter(&self) -> &Arc<dyn StatusReporter> {
        &self.reporter
    }

    fn progress(&self, phase: Phase, percent: u8) {
        self.reporter.report_progress(Progress::new(phase, percent));
    }

    fn status(&self, status: &str) {
        self.reporter.report_status(status);
    }

    /// Precondition failure: report it, leave the session untouched.
    fn reject(&self, err: PublisherError) -> PublisherError {
        tracing::debug!("[strata] Rejected: {}", err);
        self.status(&err.to_string());
        err
    }

    /// Backend failure: mark the session failed and report it.
    fn fail(&self, session: &mut PublicationSession, err: PublisherError) -> PublisherError {
        tracing::warn!(
            session = %session.id(),
            phase = %session.phase(),
            "[strata] {}",
            err
        );
        session.fail(err.to_string());
        self.status(&err.to_string());
        err
    }

    /// Funding check run before every ledger submission.
    async fn check_funds(&self, phase: Phase, owner: &AccountAddress) -> Result<(), PublisherError> {
        let balance = match self.ledger.get_balance(owner).await {
            Ok(balance) => balance,
            Err(e) => {
                let cause = format!("balance check failed: {e}");
                let err = match phase {
                    Phase::Certifying => PublisherError::CertifyError { cause },
                    _ => PublisherError::RegisterError { cause },
                };
                return Err(self.reject(err));
            }
        };
        tracing::debug!(account = %owner, %balance, "[strata] Balance checked for {}", phase);
        invariant_sufficient_funds(phase, balance, self.config.min_balance)
            .map_err(|e| self.reject(e))
    }
}

#[async_trait]
impl<S, L> PublicationApi for PublicationService<S, L>
where
    S: StorageBackend + ?Sized + 'static,
    L: LedgerBackend + ?Sized + 'static,
{
    async fn encode(&self, source: SourceObject) -> Result<PublicationSession, FlowFailure> {
        if let Err(e) = invariant_input_size(source.len(), self.config.max_file_size) {
            return Err(FlowFailure::without_session(self.reject(e)));
        }
        let mut session = PublicationSession::new(source);
        match self.encode_session(&mut session).await {
            Ok(()) => Ok(session),
            Err(error) => Err(FlowFailure {
                error,
                session: Some(session),
            }),
        }
    }

    async fn encode_session(
        &self,
        session: &mut PublicationSession,
    ) -> Result<(), PublisherError> {
        session
            .ensure_can_start(Operation::Encode)
            .map_err(|e| self.reject(e))?;
        invariant_input_size(session.source().len(), self.config.max_file_size)
            .map_err(|e| self.reject(e))?;

        session.begin(Operation::Encode)?;
        self.progress(Phase::Encoding, 0);
        self.status("Encoding...");

        match self.storage.encode(session.source()).await {
            Ok(handle) => {
                session.record_encoded(handle);
                session.complete(Operation::Encode)?;
                self.progress(Phase::Encoded, 100);
                self.status("Encoded");
                tracing::info!(
                    session = %session.id(),
                    identifier = session.identifier(),
                    bytes = session.source().len(),
                    "[strata] Encoded"
                );
                Ok(())
            }
            Err(e) => Err(self.fail(
                session,
                PublisherError::EncodeError {
                    cause: e.to_string(),
                },
            )),
        }
    }

    async fn register(
        &self,
        session: &mut PublicationSession,
        retention_epochs: u32,
        owner: &AccountAddress,
    ) -> Result<TxDigest, PublisherError> {
        session
            .ensure_can_start(Operation::Register)
            .map_err(|e| self.reject(e))?;
        if retention_epochs == 0 {
            return Err(self.reject(PublisherError::InvalidRetention));
        }
        self.check_funds(Phase::Registering, owner).await?;

        session.begin(Operation::Register)?;
        self.progress(Phase::Registering, 0);
        self.status("Registering...");

        let built = match session.encoded_handle() {
            Some(handle) => {
                self.storage
                    .build_register_tx(handle, retention_epochs, owner, self.config.deletable)
                    .await
            }
            None => Err(missing_handle()),
        };
        let tx = match built {
            Ok(tx) => tx,
            Err(e) => {
                let cause = e.to_string();
                return Err(self.fail(session, PublisherError::RegisterError { cause }));
            }
        };
        self.progress(Phase::Registering, 50);

        let submitted = match self.ledger.sign_and_submit(tx).await {
            Ok(submitted) => submitted,
            Err(e) => {
                let cause = e.to_string();
                return Err(self.fail(session, PublisherError::RegisterError { cause }));
            }
        };

        let digest = submitted.digest;
        session.record_registration(digest.clone(), retention_epochs, owner.clone());
        session.complete(Operation::Register)?;
        self.progress(Phase::Registered, 100);
        self.status(&format!("Register tx executed: {digest}"));
        tracing::info!(
            session = %session.id(),
            digest = %digest,
            epochs = retention_epochs,
            "[strata] Registered"
        );
        Ok(digest)
    }

    async fn upload(
        &self,
        session: &mut PublicationSession,
        digest: Option<&TxDigest>,
        cancel: &CancellationSignal,
    ) -> Result<(), PublisherError> {
        session
            .ensure_can_start(Operation::Upload)
            .map_err(|e| self.reject(e))?;
        invariant_digest_match(session.registration_digest(), digest)
            .map_err(|e| self.reject(e))?;
        let registration = match digest.or(session.registration_digest()) {
            Some(d) => d.clone(),
            None => return Err(self.reject(PublisherError::MissingDigest)),
        };
        session.record_supplied_digest(&registration);

        session.begin(Operation::Upload)?;
        self.progress(Phase::Uploading, 0);
        self.status("Uploading shards...");

        let reporter = Arc::clone(&self.reporter);
        let on_progress = move |fraction: f64| {
            reporter.report_progress(Progress::from_fraction(Phase::Uploading, fraction));
        };

        let uploaded = match session.encoded_handle() {
            Some(handle) => {
                tokio::select! {
                    res = self.storage.upload_shards(handle, &registration, &on_progress, cancel) => res,
                    _ = cancel.cancelled() => Err(BackendError::Cancelled),
                }
            }
            None => Err(missing_handle()),
        };

        match uploaded {
            Ok(()) => {
                session.complete(Operation::Upload)?;
                self.progress(Phase::Uploaded, 100);
                self.status("Upload complete, ready to certify");
                tracing::info!(
                    session = %session.id(),
                    digest = %registration,
                    "[strata] Uploaded"
                );
                Ok(())
            }
            Err(BackendError::Cancelled) => {
                let cause = "upload cancelled".to_string();
                Err(self.fail(session, PublisherError::UploadError { cause }))
            }
            Err(e) => {
                let cause = e.to_string();
                Err(self.fail(session, PublisherError::UploadError { cause }))
            }
        }
    }

    async fn certify(
        &self,
        session: &mut PublicationSession,
    ) -> Result<CertifyOutcome, PublisherError> {
        session
            .ensure_can_start(Operation::Certify)
            .map_err(|e| self.reject(e))?;
        let owner = match session.owner() {
            Some(owner) => owner.clone(),
            None => {
                return Err(self.reject(PublisherError::MissingAccount {
                    phase: Phase::Certifying,
                }))
            }
        };
        // An accepted certify tx is never paid for twice.
        let pending = session.certification_digest().cloned();
        if pending.is_none() {
            self.check_funds(Phase::Certifying, &owner).await?;
        }

        session.begin(Operation::Certify)?;
        self.progress(Phase::Certifying, 0);
        self.status("Certifying...");

        let digest = match pending {
            Some(digest) => {
                tracing::debug!(digest = %digest, "[strata] Certify tx already accepted, listing files");
                digest
            }
            None => {
                let built = match session.encoded_handle() {
                    Some(handle) => self.storage.build_certify_tx(handle).await,
                    None => Err(missing_handle()),
                };
                let tx = match built {
                    Ok(tx) => tx,
                    Err(e) => {
                        let cause = e.to_string();
                        return Err(self.fail(session, PublisherError::CertifyError { cause }));
                    }
                };
                let submitted = match self.ledger.sign_and_submit(tx).await {
                    Ok(submitted) => submitted,
                    Err(e) => {
                        let cause = e.to_string();
                        return Err(self.fail(session, PublisherError::CertifyError { cause }));
                    }
                };
                session.record_certification(submitted.digest.clone());
                self.status(&format!("Certify tx executed: {}", submitted.digest));
                submitted.digest
            }
        };
        self.progress(Phase::Certifying, 50);

        let listed = match session.encoded_handle() {
            Some(handle) => self.storage.list_published_files(handle).await,
            None => Err(missing_handle()),
        };
        let files = match listed {
            Ok(files) => files,
            Err(e) => {
                let cause = format!("certified as {digest} but listing failed: {e}");
                return Err(self.fail(session, PublisherError::CertifyError { cause }));
            }
        };

        session.finish_certification();
        session.complete(Operation::Certify)?;
        self.progress(Phase::Certified, 100);

        let outcome = CertifyOutcome { digest, files };
        match outcome.primary_content_id() {
            Some(id) => self.status(&format!("Published as {id}")),
            None => self.status("Certified"),
        }
        tracing::info!(
            session = %session.id(),
            digest = %outcome.digest,
            files = outcome.files.len(),
            "[strata] Certified"
        );
        Ok(outcome)
    }

    async fn run_full_flow(&self, request: FlowRequest) -> Result<CertifyOutcome, FlowFailure> {
        let _guard = match FlowGuard::acquire(&self.flow_running) {
            Some(guard) => guard,
            None => {
                // The running flow owns the status line.
                tracing::warn!("[strata] Full flow refused, another flow is running");
                return Err(FlowFailure::without_session(PublisherError::AlreadyRunning));
            }
        };

        let FlowRequest {
            source,
            retention_epochs,
            owner,
            cancel,
        } = request;
        let mut session = PublicationSession::new(source);
        tracing::info!(
            session = %session.id(),
            identifier = session.identifier(),
            "[strata] Starting full flow"
        );

        let result = async {
            self.encode_session(&mut session).await?;
            self.register(&mut session, retention_epochs, &owner).await?;
            self.upload(&mut session, None, &cancel).await?;
            self.certify(&mut session).await
        }
        .await;

        result.map_err(|error| FlowFailure {
            error,
            session: Some(session),
        })
    }

    fn is_flow_running(&self) -> bool {
        self.flow_running.load(Ordering::Acquire)
    }
}
