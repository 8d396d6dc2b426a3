//! # Domain Errors
//!
//! Error types for publication and retrieval.

use super::value_objects::{Amount, ContentId, Operation, Phase, TxDigest};
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a storage or ledger backend.
///
/// Backends never surface these to callers directly; the engine converts them
/// at the phase boundary into a [`PublisherError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport or RPC failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request was refused (signing rejection, invalid transaction).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Any other backend failure.
    #[error("{0}")]
    Failed(String),

    /// Operation aborted by a cancellation signal.
    #[error("cancelled")]
    Cancelled,
}

/// Publisher error types.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Source buffer is empty.
    #[error("Cannot publish an empty file")]
    EmptyInput,

    /// Source exceeds the configured maximum.
    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    InputTooLarge {
        /// Actual size in bytes
        size: u64,
        /// Configured maximum in bytes
        max: u64,
    },

    /// Local file could not be read.
    #[error("Failed to read {path}: {cause}")]
    ReadError {
        /// Path that was read
        path: PathBuf,
        /// I/O error message
        cause: String,
    },

    /// Operation invoked from a phase that is not one of its predecessors.
    #[error("Cannot {operation} while session is {from}")]
    InvalidPhaseTransition {
        /// Attempted operation
        operation: Operation,
        /// Session phase at the time of the call
        from: Phase,
    },

    /// Retention period must be at least one epoch.
    #[error("Retention must be at least one epoch")]
    InvalidRetention,

    /// Balance below the funding threshold.
    #[error("Insufficient funds for {phase}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Phase that needed funding
        phase: Phase,
        /// Observed balance
        balance: Amount,
        /// Required minimum
        required: Amount,
    },

    /// Storage backend failed to encode.
    #[error("Encode failed: {cause}")]
    EncodeError {
        /// Backend message
        cause: String,
    },

    /// Register transaction could not be built, signed or submitted.
    #[error("Register failed: {cause}")]
    RegisterError {
        /// Backend message
        cause: String,
    },

    /// Shard upload failed or was cancelled.
    #[error("Upload failed: {cause}")]
    UploadError {
        /// Backend message
        cause: String,
    },

    /// Certify transaction or file listing failed.
    #[error("Certify failed: {cause}")]
    CertifyError {
        /// Backend message
        cause: String,
    },

    /// Supplied registration digest differs from the session's own.
    #[error("Registration digest mismatch: session has {expected}, got {supplied}")]
    DigestMismatch {
        /// Digest recorded on the session
        expected: TxDigest,
        /// Digest supplied by the caller
        supplied: TxDigest,
    },

    /// Upload requested with no registration digest available.
    #[error("No registration digest available for upload")]
    MissingDigest,

    /// Ledger-submitting operation with no owner account recorded.
    #[error("No account available for {phase}")]
    MissingAccount {
        /// Phase that needed the account
        phase: Phase,
    },

    /// Content identifier failed validation.
    #[error("Invalid content identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Both retrieval paths failed.
    #[error("Failed to retrieve {content_id}: {cause}")]
    RetrievalError {
        /// Requested identifier
        content_id: ContentId,
        /// Failure detail of the last path tried
        cause: String,
    },

    /// No held resource belongs to the given result.
    #[error("No active resource")]
    NoActiveResource,

    /// A full flow is already running on this engine.
    #[error("A publication flow is already running")]
    AlreadyRunning,
}

impl PublisherError {
    /// Phase the error is attributed to, where applicable.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::EmptyInput | Self::InputTooLarge { .. } | Self::ReadError { .. } => {
                Some(Phase::Idle)
            }
            Self::EncodeError { .. } => Some(Phase::Encoding),
            Self::RegisterError { .. } | Self::InvalidRetention => Some(Phase::Registering),
            Self::UploadError { .. } | Self::DigestMismatch { .. } | Self::MissingDigest => {
                Some(Phase::Uploading)
            }
            Self::CertifyError { .. } => Some(Phase::Certifying),
            Self::InsufficientFunds { phase, .. } | Self::MissingAccount { phase } => Some(*phase),
            Self::InvalidPhaseTransition { operation, .. } => Some(operation.in_flight_phase()),
            Self::InvalidIdentifier(_)
            | Self::RetrievalError { .. }
            | Self::NoActiveResource
            | Self::AlreadyRunning => None,
        }
    }

    /// Publication operation the error belongs to, where applicable.
    pub fn operation(&self) -> Option<Operation> {
        self.phase().and_then(|phase| match phase {
            Phase::Idle => Some(Operation::Encode),
            other => Operation::for_phase(other),
        })
    }

    /// True for failures raised by a backend call (as opposed to a
    /// precondition check).
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::EncodeError { .. }
                | Self::RegisterError { .. }
                | Self::UploadError { .. }
                | Self::CertifyError { .. }
                | Self::RetrievalError { .. }
        )
    }
}
