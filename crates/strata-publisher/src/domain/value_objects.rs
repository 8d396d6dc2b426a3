//! # Domain Value Objects
//!
//! Immutable value types for the publication and retrieval engine.

use super::errors::PublisherError;
use super::invariants::{invariant_content_id, OCTET_STREAM};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base units in one whole ledger coin.
pub const BASE_UNITS_PER_COIN: u64 = 1_000_000_000;

/// Publication phase state machine.
///
/// The forward path is
/// `Idle -> Encoding -> Encoded -> Registering -> Registered -> Uploading
/// -> Uploaded -> Certifying -> Certified`. Any in-flight phase may move to
/// `Failed`; a failed session only leaves `Failed` by recovering to the last
/// phase it completed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Session created, nothing encoded yet.
    #[default]
    Idle,
    /// Encoding in progress.
    Encoding,
    /// Encoded handle available.
    Encoded,
    /// Register transaction in flight.
    Registering,
    /// Registration digest recorded.
    Registered,
    /// Shards streaming to storage nodes.
    Uploading,
    /// All shards accepted.
    Uploaded,
    /// Certify transaction in flight.
    Certifying,
    /// Object durably stored; the session is spent.
    Certified,
    /// Last operation failed.
    Failed,
}

impl Phase {
    /// Lowercase phase name for status lines and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Encoding => "encoding",
            Self::Encoded => "encoded",
            Self::Registering => "registering",
            Self::Registered => "registered",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Certifying => "certifying",
            Self::Certified => "certified",
            Self::Failed => "failed",
        }
    }

    /// A backend call is outstanding in this phase.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Encoding | Self::Registering | Self::Uploading | Self::Certifying
        )
    }

    /// Phases a session can rest in between operations (checkpoints).
    pub fn is_stable(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Encoded | Self::Registered | Self::Uploaded | Self::Certified
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Certified)
    }

    /// Check if transition is valid.
    ///
    /// `checkpoint` is the last stable phase the session completed and is
    /// only consulted when leaving `Failed`.
    pub fn can_transition_to(&self, next: Phase, checkpoint: Phase) -> bool {
        match (self, next) {
            (Self::Idle, Self::Encoding) => true,
            (Self::Encoding, Self::Encoded) => true,
            (Self::Encoded, Self::Registering) => true,
            (Self::Registering, Self::Registered) => true,
            (Self::Registered, Self::Uploading) => true,
            (Self::Uploading, Self::Uploaded) => true,
            (Self::Uploaded, Self::Certifying) => true,
            (Self::Certifying, Self::Certified) => true,
            // Resumed upload with a digest from an earlier registration.
            (Self::Encoded, Self::Uploading) => true,
            // Certify invoked directly after registration.
            (Self::Registered, Self::Certifying) => true,
            (current, Self::Failed) => current.is_in_flight(),
            (Self::Failed, target) => target == checkpoint && checkpoint.is_stable(),
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four phase operations a caller can invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Erasure-encode the source bytes.
    Encode,
    /// Submit the registration transaction.
    Register,
    /// Push shards to storage nodes.
    Upload,
    /// Submit the certify transaction.
    Certify,
}

impl Operation {
    /// Phase the session sits in while this operation runs.
    pub fn in_flight_phase(&self) -> Phase {
        match self {
            Self::Encode => Phase::Encoding,
            Self::Register => Phase::Registering,
            Self::Upload => Phase::Uploading,
            Self::Certify => Phase::Certifying,
        }
    }

    /// Phase the session reaches when this operation succeeds.
    pub fn completed_phase(&self) -> Phase {
        match self {
            Self::Encode => Phase::Encoded,
            Self::Register => Phase::Registered,
            Self::Upload => Phase::Uploaded,
            Self::Certify => Phase::Certified,
        }
    }

    /// Stable phases from which this operation may start.
    pub fn predecessors(&self) -> &'static [Phase] {
        match self {
            Self::Encode => &[Phase::Idle],
            Self::Register => &[Phase::Encoded],
            Self::Upload => &[Phase::Registered, Phase::Encoded],
            Self::Certify => &[Phase::Uploaded, Phase::Registered],
        }
    }

    /// Whether the operation needs the session's encoded handle.
    pub fn requires_handle(&self) -> bool {
        !matches!(self, Self::Encode)
    }

    /// Operation that owns the given in-flight phase, if any.
    pub fn for_phase(phase: Phase) -> Option<Self> {
        match phase {
            Phase::Encoding => Some(Self::Encode),
            Phase::Registering => Some(Self::Register),
            Phase::Uploading => Some(Self::Upload),
            Phase::Certifying => Some(Self::Certify),
            _ => None,
        }
    }

    /// Lowercase operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Register => "register",
            Self::Upload => "upload",
            Self::Certify => "certify",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot pushed to the status reporter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase.
    pub phase: Phase,
    /// Completion within the phase, 0..=100.
    pub percent: u8,
}

impl Progress {
    /// Create a progress value, clamping the percentage to 100.
    pub fn new(phase: Phase, percent: u8) -> Self {
        Self {
            phase,
            percent: percent.min(100),
        }
    }

    /// Scale a backend fraction in `[0.0, 1.0]` to a whole percentage.
    pub fn from_fraction(phase: Phase, fraction: f64) -> Self {
        let percent = if fraction.is_nan() {
            0
        } else {
            (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
        };
        Self::new(phase, percent)
    }
}

/// Ledger transaction digest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxDigest(String);

impl TxDigest {
    /// Wrap a digest string returned by the ledger.
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content identifier of a published object.
///
/// Always non-empty and restricted to `[A-Za-z0-9_-]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    /// Parse user or backend input, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, PublisherError> {
        let trimmed = raw.trim();
        invariant_content_id(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger account address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountAddress(String);

impl AccountAddress {
    /// Wrap an account address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger amount in base units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u64);

impl Amount {
    /// Zero balance.
    pub const ZERO: Amount = Amount(0);

    /// Amount from base units.
    pub const fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    /// Amount from whole coins.
    pub const fn from_coins(coins: u64) -> Self {
        Self(coins.saturating_mul(BASE_UNITS_PER_COIN))
    }

    /// Raw base units.
    pub fn base_units(&self) -> u64 {
        self.0
    }

    /// Parse a decimal coin amount such as `"0.1"` or `"12"`.
    pub fn parse_coins(input: &str) -> Option<Self> {
        let input = input.trim();
        let (whole, fraction) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let fraction_units: u64 = if fraction.is_empty() {
            0
        } else {
            format!("{fraction:0<9}").parse().ok()?
        };
        whole
            .checked_mul(BASE_UNITS_PER_COIN)?
            .checked_add(fraction_units)
            .map(Self)
    }

    /// Subtract, returning `None` on underflow.
    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating addition.
    pub fn saturating_add(&self, other: Amount) -> Amount {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:09}",
            self.0 / BASE_UNITS_PER_COIN,
            self.0 % BASE_UNITS_PER_COIN
        )
    }
}

/// How a front end should preview a fetched object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewKind {
    /// Inline image preview.
    Image,
    /// Inline video player.
    Video,
    /// Download only.
    Binary,
}

/// Advisory media type tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaType(String);

impl MediaType {
    /// Wrap a media type; blank input becomes `application/octet-stream`.
    pub fn new(media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        if media_type.trim().is_empty() {
            Self::octet_stream()
        } else {
            Self(media_type.trim().to_string())
        }
    }

    /// Resolve an optional backend tag.
    pub fn from_tag(tag: Option<String>) -> Self {
        tag.map(Self::new).unwrap_or_else(Self::octet_stream)
    }

    /// Opaque binary.
    pub fn octet_stream() -> Self {
        Self(OCTET_STREAM.to_string())
    }

    /// Media type as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify for preview.
    pub fn preview_kind(&self) -> PreviewKind {
        if self.0.starts_with("image/") {
            PreviewKind::Image
        } else if self.0.starts_with("video/") {
            PreviewKind::Video
        } else {
            PreviewKind::Binary
        }
    }
}

impl Default for MediaType {
    fn default() -> Self {
        Self::octet_stream()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token returned by the storage backend after encoding.
///
/// The engine never inspects it; it is only threaded back into later
/// backend calls. Deliberately not `Clone`: the session owns it exclusively.
#[derive(Debug, PartialEq, Eq)]
pub struct EncodedHandle(String);

impl EncodedHandle {
    /// Created by storage backends.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Backend-side lookup key.
    pub fn token(&self) -> &str {
        &self.0
    }
}

/// Kind of ledger transaction built by the storage backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Reserves storage and ownership for an encoded object.
    Register,
    /// Finalizes an object as durably stored.
    Certify,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => f.write_str("register"),
            Self::Certify => f.write_str("certify"),
        }
    }
}

/// Unsigned ledger transaction, opaque to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Backend-defined payload.
    pub payload: Vec<u8>,
}

impl LedgerTransaction {
    /// Create a transaction.
    pub fn new(kind: TransactionKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// Key of a materialized local resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    /// Created by resource stores.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Numeric id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Which retrieval path produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchSource {
    /// Structured fetch with identifier/media-type metadata.
    Structured,
    /// Raw blob read without metadata.
    RawBlob,
}

impl FetchSource {
    /// Snake-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::RawBlob => "raw_blob",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_forward_path() {
        let path = [
            Phase::Idle,
            Phase::Encoding,
            Phase::Encoded,
            Phase::Registering,
            Phase::Registered,
            Phase::Uploading,
            Phase::Uploaded,
            Phase::Certifying,
            Phase::Certified,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1], Phase::Idle));
        }
    }

    #[test]
    fn test_phase_no_skipping() {
        assert!(!Phase::Idle.can_transition_to(Phase::Registering, Phase::Idle));
        assert!(!Phase::Encoded.can_transition_to(Phase::Certifying, Phase::Idle));
        assert!(!Phase::Certified.can_transition_to(Phase::Uploading, Phase::Idle));
        assert!(!Phase::Registered.can_transition_to(Phase::Encoding, Phase::Idle));
    }

    #[test]
    fn test_phase_transition_table_is_closed() {
        use Phase::*;
        const ALL: [Phase; 10] = [
            Idle,
            Encoding,
            Encoded,
            Registering,
            Registered,
            Uploading,
            Uploaded,
            Certifying,
            Certified,
            Failed,
        ];
        const EDGES: [(Phase, Phase); 10] = [
            (Idle, Encoding),
            (Encoding, Encoded),
            (Encoded, Registering),
            (Registering, Registered),
            (Registered, Uploading),
            (Uploading, Uploaded),
            (Uploaded, Certifying),
            (Certifying, Certified),
            (Encoded, Uploading),
            (Registered, Certifying),
        ];
        const IN_FLIGHT: [Phase; 4] = [Encoding, Registering, Uploading, Certifying];
        const CHECKPOINTS: [Phase; 5] = [Idle, Encoded, Registered, Uploaded, Certified];

        for from in ALL {
            for to in ALL {
                for checkpoint in ALL {
                    let allowed = EDGES.contains(&(from, to))
                        || (to == Failed && IN_FLIGHT.contains(&from))
                        || (from == Failed && to == checkpoint && CHECKPOINTS.contains(&to));
                    assert_eq!(
                        from.can_transition_to(to, checkpoint),
                        allowed,
                        "{from} -> {to} (checkpoint {checkpoint})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_phase_failure_only_from_in_flight() {
        assert!(Phase::Uploading.can_transition_to(Phase::Failed, Phase::Registered));
        assert!(!Phase::Registered.can_transition_to(Phase::Failed, Phase::Registered));
        assert!(!Phase::Certified.can_transition_to(Phase::Failed, Phase::Certified));
    }

    #[test]
    fn test_phase_recovery_only_to_checkpoint() {
        assert!(Phase::Failed.can_transition_to(Phase::Registered, Phase::Registered));
        assert!(!Phase::Failed.can_transition_to(Phase::Uploaded, Phase::Registered));
        assert!(!Phase::Failed.can_transition_to(Phase::Uploading, Phase::Registered));
    }

    #[test]
    fn test_progress_from_fraction() {
        assert_eq!(Progress::from_fraction(Phase::Uploading, 0.426).percent, 43);
        assert_eq!(Progress::from_fraction(Phase::Uploading, 1.7).percent, 100);
        assert_eq!(Progress::from_fraction(Phase::Uploading, f64::NAN).percent, 0);
    }

    #[test]
    fn test_amount_parse_coins() {
        assert_eq!(
            Amount::parse_coins("0.1"),
            Some(Amount::from_base_units(100_000_000))
        );
        assert_eq!(Amount::parse_coins("2"), Some(Amount::from_coins(2)));
        assert_eq!(Amount::parse_coins(".05"), Some(Amount::from_base_units(50_000_000)));
        assert_eq!(Amount::parse_coins("1.0000000001"), None);
        assert_eq!(Amount::parse_coins("abc"), None);
        assert_eq!(Amount::parse_coins("."), None);
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::from_base_units(50_000_000).to_string(), "0.050000000");
    }

    #[test]
    fn test_media_type_defaults_and_preview() {
        assert_eq!(MediaType::new("  ").as_str(), OCTET_STREAM);
        assert_eq!(MediaType::from_tag(None).as_str(), OCTET_STREAM);
        assert_eq!(MediaType::new("image/png").preview_kind(), PreviewKind::Image);
        assert_eq!(MediaType::new("video/mp4").preview_kind(), PreviewKind::Video);
        assert_eq!(MediaType::new("text/plain").preview_kind(), PreviewKind::Binary);
    }

    #[test]
    fn test_content_id_parse_trims() {
        let id = ContentId::parse("  abc-123_XY \n").unwrap();
        assert_eq!(id.as_str(), "abc-123_XY");
        assert!(ContentId::parse("bad id!").is_err());
        assert!(ContentId::parse("   ").is_err());
    }
}
