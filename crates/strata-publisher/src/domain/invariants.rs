//! # Domain Invariants
//!
//! Checks shared by the publication and retrieval services.

use super::entities::PublicationSession;
use super::errors::PublisherError;
use super::value_objects::{Amount, Phase, TxDigest};

/// Default upload ceiling: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Default funding threshold: 0.1 coin.
pub const DEFAULT_MIN_BALANCE: u64 = 100_000_000;

/// Default retention period in storage epochs.
pub const DEFAULT_RETENTION_EPOCHS: u32 = 3;

/// Fallback media type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Tag key carrying the media type in published file records.
pub const CONTENT_TYPE_TAG: &str = "content-type";

/// Source must be non-empty and within the configured ceiling.
pub fn invariant_input_size(size: u64, max: u64) -> Result<(), PublisherError> {
    if size == 0 {
        return Err(PublisherError::EmptyInput);
    }
    if size > max {
        return Err(PublisherError::InputTooLarge { size, max });
    }
    Ok(())
}

/// Balance must reach the funding threshold before any ledger submission.
pub fn invariant_sufficient_funds(
    phase: Phase,
    balance: Amount,
    required: Amount,
) -> Result<(), PublisherError> {
    if balance < required {
        return Err(PublisherError::InsufficientFunds {
            phase,
            balance,
            required,
        });
    }
    Ok(())
}

/// Content identifiers are non-empty `[A-Za-z0-9_-]+`.
pub fn invariant_content_id(candidate: &str) -> Result<(), PublisherError> {
    let valid = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PublisherError::InvalidIdentifier(candidate.to_string()))
    }
}

/// A caller-supplied digest must match the session's own, if it has one.
pub fn invariant_digest_match(
    own: Option<&TxDigest>,
    supplied: Option<&TxDigest>,
) -> Result<(), PublisherError> {
    match (own, supplied) {
        (Some(expected), Some(supplied)) if expected != supplied => {
            Err(PublisherError::DigestMismatch {
                expected: expected.clone(),
                supplied: supplied.clone(),
            })
        }
        (None, None) => Err(PublisherError::MissingDigest),
        _ => Ok(()),
    }
}

/// A certified session never keeps its handle or registration digest.
pub fn invariant_certified_clears_handle(session: &PublicationSession) -> bool {
    session.phase() != Phase::Certified
        || (session.encoded_handle().is_none() && session.registration_digest().is_none())
}
