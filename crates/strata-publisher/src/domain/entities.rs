//! # Domain Entities
//!
//! Publication sessions, retrieval results and flow envelopes.

use super::cancellation::CancellationSignal;
use super::errors::PublisherError;
use super::invariants::CONTENT_TYPE_TAG;
use super::value_objects::{
    AccountAddress, ContentId, EncodedHandle, FetchSource, MediaType, Operation, Phase,
    PreviewKind, ResourceHandle, TxDigest,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Bytes selected for publication plus their display metadata.
#[derive(Clone)]
pub struct SourceObject {
    /// Immutable payload.
    pub bytes: Arc<[u8]>,
    /// Display name.
    pub identifier: String,
    /// Advisory content type.
    pub content_type: MediaType,
}

impl SourceObject {
    /// Create a source object.
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        identifier: impl Into<String>,
        content_type: MediaType,
    ) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            identifier: identifier.into(),
            content_type,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SourceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceObject")
            .field("len", &self.bytes.len())
            .field("identifier", &self.identifier)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// One in-flight attempt to publish a file.
///
/// Fields are private: every mutation goes through the phase helpers below,
/// which enforce [`Phase::can_transition_to`].
#[derive(Debug)]
pub struct PublicationSession {
    id: Uuid,
    source: SourceObject,
    phase: Phase,
    checkpoint: Phase,
    failure: Option<String>,
    failed_operation: Option<Operation>,
    encoded_handle: Option<EncodedHandle>,
    registration_digest: Option<TxDigest>,
    certification_digest: Option<TxDigest>,
    retention_epochs: Option<u32>,
    owner: Option<AccountAddress>,
}

impl PublicationSession {
    /// Fresh Idle session for `source`.
    pub fn new(source: SourceObject) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            phase: Phase::Idle,
            checkpoint: Phase::Idle,
            failure: None,
            failed_operation: None,
            encoded_handle: None,
            registration_digest: None,
            certification_digest: None,
            retention_epochs: None,
            owner: None,
        }
    }

    /// Correlation id for logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Source object.
    pub fn source(&self) -> &SourceObject {
        &self.source
    }

    /// Display name.
    pub fn identifier(&self) -> &str {
        &self.source.identifier
    }

    /// Advisory content type.
    pub fn content_type(&self) -> &MediaType {
        &self.source.content_type
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last completed stable phase.
    pub fn checkpoint(&self) -> Phase {
        self.checkpoint
    }

    /// Message of the last failure while `Failed`.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Operation whose failure left the session in `Failed`.
    pub fn failed_operation(&self) -> Option<Operation> {
        self.failed_operation
    }

    /// Handle returned by encode.
    pub fn encoded_handle(&self) -> Option<&EncodedHandle> {
        self.encoded_handle.as_ref()
    }

    /// Digest of the register transaction.
    pub fn registration_digest(&self) -> Option<&TxDigest> {
        self.registration_digest.as_ref()
    }

    /// Digest of a submitted certify transaction awaiting listing.
    pub fn certification_digest(&self) -> Option<&TxDigest> {
        self.certification_digest.as_ref()
    }

    /// Retention recorded at registration.
    pub fn retention_epochs(&self) -> Option<u32> {
        self.retention_epochs
    }

    /// Owner recorded at registration.
    pub fn owner(&self) -> Option<&AccountAddress> {
        self.owner.as_ref()
    }

    /// Phase an operation would resume from.
    ///
    /// A failed session, or one whose operation future was dropped mid-call,
    /// resumes from its checkpoint.
    pub fn resumable_phase(&self) -> Phase {
        if self.phase == Phase::Failed || self.phase.is_in_flight() {
            self.checkpoint
        } else {
            self.phase
        }
    }

    /// Check that `operation` may start on this session.
    pub fn ensure_can_start(&self, operation: Operation) -> Result<(), PublisherError> {
        let from = self.resumable_phase();
        let phase_ok = operation.predecessors().contains(&from);
        let handle_ok = !operation.requires_handle() || self.encoded_handle.is_some();
        if !phase_ok || !handle_ok {
            return Err(PublisherError::InvalidPhaseTransition {
                operation,
                from: self.phase,
            });
        }
        // A failed session is retried only by the operation that failed.
        let retrying_other = self.failed_operation.is_some_and(|op| op != operation);
        if self.phase == Phase::Failed && retrying_other {
            return Err(PublisherError::InvalidPhaseTransition {
                operation,
                from: self.phase,
            });
        }
        Ok(())
    }

    /// Enter the in-flight phase of `operation`, recovering from a failure
    /// first when needed.
    pub fn begin(&mut self, operation: Operation) -> Result<(), PublisherError> {
        self.ensure_can_start(operation)?;
        if self.phase == Phase::Failed {
            self.transition(Phase::Failed, self.checkpoint, operation)?;
            self.failure = None;
            self.failed_operation = None;
        } else if self.phase.is_in_flight() {
            // Interrupted call; nothing was recorded past the checkpoint.
            self.phase = self.checkpoint;
        }
        self.transition(self.phase, operation.in_flight_phase(), operation)
    }

    /// Mark the in-flight operation as completed.
    pub fn complete(&mut self, operation: Operation) -> Result<(), PublisherError> {
        let next = operation.completed_phase();
        self.transition(self.phase, next, operation)?;
        self.checkpoint = next;
        Ok(())
    }

    /// Mark the in-flight operation as failed with `cause`.
    pub fn fail(&mut self, cause: impl Into<String>) {
        if self.phase.can_transition_to(Phase::Failed, self.checkpoint) {
            self.failed_operation = Operation::for_phase(self.phase);
            self.phase = Phase::Failed;
            self.failure = Some(cause.into());
        }
    }

    /// Record the handle returned by encode.
    pub fn record_encoded(&mut self, handle: EncodedHandle) {
        self.encoded_handle = Some(handle);
    }

    /// Record registration results.
    pub fn record_registration(&mut self, digest: TxDigest, epochs: u32, owner: AccountAddress) {
        self.registration_digest = Some(digest);
        self.retention_epochs = Some(epochs);
        self.owner = Some(owner);
    }

    /// Adopt a registration submitted outside this session.
    ///
    /// Used to resume an interrupted flow: the encoded session uploads
    /// against `digest` and certifies with `owner` paying.
    pub fn resume_registration(
        &mut self,
        digest: TxDigest,
        epochs: u32,
        owner: AccountAddress,
    ) -> Result<(), PublisherError> {
        if self.resumable_phase() != Phase::Encoded || self.encoded_handle.is_none() {
            return Err(PublisherError::InvalidPhaseTransition {
                operation: Operation::Upload,
                from: self.phase,
            });
        }
        if epochs == 0 {
            return Err(PublisherError::InvalidRetention);
        }
        if let Some(expected) = &self.registration_digest {
            if *expected != digest {
                return Err(PublisherError::DigestMismatch {
                    expected: expected.clone(),
                    supplied: digest,
                });
            }
        }
        self.record_registration(digest, epochs, owner);
        Ok(())
    }

    /// Keep a caller-supplied registration digest for upload retries.
    pub fn record_supplied_digest(&mut self, digest: &TxDigest) {
        if self.registration_digest.is_none() {
            self.registration_digest = Some(digest.clone());
        }
    }

    /// Record an accepted certify transaction before listing.
    pub fn record_certification(&mut self, digest: TxDigest) {
        self.certification_digest = Some(digest);
    }

    /// Drop the handle and digests once certified.
    ///
    /// Returns the certify digest.
    pub fn finish_certification(&mut self) -> Option<TxDigest> {
        self.encoded_handle = None;
        self.registration_digest = None;
        self.certification_digest.take()
    }

    fn transition(
        &mut self,
        from: Phase,
        to: Phase,
        operation: Operation,
    ) -> Result<(), PublisherError> {
        if !from.can_transition_to(to, self.checkpoint) {
            return Err(PublisherError::InvalidPhaseTransition {
                operation,
                from: self.phase,
            });
        }
        self.phase = to;
        Ok(())
    }
}

/// Transaction accepted by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    /// Ledger digest.
    pub digest: TxDigest,
}

/// File listed by the storage backend after certification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedFileRecord {
    /// Content identifier.
    pub content_id: ContentId,
    /// Display name, if recorded.
    pub identifier: Option<String>,
    /// Backend tags.
    pub tags: BTreeMap<String, String>,
}

impl PublishedFileRecord {
    /// Media type from the tags.
    pub fn media_type(&self) -> MediaType {
        MediaType::from_tag(self.tags.get(CONTENT_TYPE_TAG).cloned())
    }
}

/// Result of a successful certify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifyOutcome {
    /// Certify transaction digest.
    pub digest: TxDigest,
    /// Files listed for the certified object.
    pub files: Vec<PublishedFileRecord>,
}

impl CertifyOutcome {
    /// Content identifier of the first listed file.
    pub fn primary_content_id(&self) -> Option<&ContentId> {
        self.files.first().map(|f| &f.content_id)
    }
}

/// Bytes returned by a structured fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedFile {
    /// Payload.
    pub bytes: Vec<u8>,
    /// Display name from metadata.
    pub identifier: Option<String>,
    /// Media type from metadata.
    pub media_type: Option<String>,
}

/// A fetched object available locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Requested identifier.
    pub content_id: ContentId,
    /// Media type, octet-stream when unknown.
    pub media_type: MediaType,
    /// Payload length.
    pub byte_length: u64,
    /// Display name from metadata.
    pub identifier: Option<String>,
    /// Path that produced the bytes.
    pub source: FetchSource,
    /// Local resource holding the bytes.
    pub resource: ResourceHandle,
}

impl RetrievalResult {
    /// How a front end should preview this result.
    pub fn preview_kind(&self) -> PreviewKind {
        self.media_type.preview_kind()
    }

    /// `<content_id>.bin`
    pub fn default_file_name(&self) -> String {
        format!("{}.bin", self.content_id)
    }
}

/// Input to a full publication flow.
#[derive(Debug)]
pub struct FlowRequest {
    /// Bytes to publish.
    pub source: SourceObject,
    /// Retention period in epochs.
    pub retention_epochs: u32,
    /// Funding and owning account.
    pub owner: AccountAddress,
    /// Upload cancellation.
    pub cancel: CancellationSignal,
}

impl FlowRequest {
    /// Request without cancellation.
    pub fn new(source: SourceObject, retention_epochs: u32, owner: AccountAddress) -> Self {
        Self {
            source,
            retention_epochs,
            owner,
            cancel: CancellationSignal::never(),
        }
    }

    /// Attach a cancellation signal.
    pub fn with_cancellation(mut self, cancel: CancellationSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Full-flow failure with the partially advanced session, if one was created.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct FlowFailure {
    /// The first failure.
    pub error: PublisherError,
    /// Session as left by the failed phase.
    pub session: Option<PublicationSession>,
}

impl FlowFailure {
    /// Failure before any session existed.
    pub fn without_session(error: PublisherError) -> Self {
        Self {
            error,
            session: None,
        }
    }
}
