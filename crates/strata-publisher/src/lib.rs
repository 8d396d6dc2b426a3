//! # Strata Publisher
//!
//! Client-side publication and retrieval engine for a ledger-anchored,
//! erasure-coded object store.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Publish a local file by sequencing four dependent phases against two
//! independent backends:
//! - **Encode** the bytes into shards (storage backend)
//! - **Register** the object with a paid ledger transaction
//! - **Upload** the shards to storage nodes
//! - **Certify** the object with a second paid transaction
//!
//! and retrieve published objects by content identifier.
//!
//! ## Guarantees
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | No double payment | Funding check before every submission; a certify retry reuses an accepted digest |
//! | Phase ordering | `Phase::can_transition_to` on every session mutation |
//! | Retry without rework | Failed sessions resume from their checkpoint |
//! | Single full flow | RAII guard over an `AtomicBool` |
//! | One held resource | Replace-and-release retrieval slot |
//!
//! ## Module Structure
//!
//! ```text
//! strata-publisher/
//! ├── domain/          # Phase machine, session, value objects, errors
//! ├── ports/           # API traits (inbound) + backend traits (outbound)
//! ├── application/     # PublicationService, RetrievalService, OneClickDriver
//! ├── adapters/        # Reporters, resource store, object reader, devnet
//! └── config.rs        # PublisherConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    guess_media_type, sanitize_file_name, DevnetLedger, DevnetStorage, LocalResourceStore,
    ObjectReader, TracingStatusReporter, WatchStatusReporter, DEFAULT_SHARD_COUNT,
};
pub use application::{failure_message, OneClickDriver, PublicationService, RetrievalService};
pub use config::PublisherConfig;
pub use domain::{
    cancellation_pair, AccountAddress, Amount, BackendError, CancellationHandle,
    CancellationSignal, CertifyOutcome, ContentId, EncodedHandle, FetchSource, FetchedFile,
    FlowFailure, FlowRequest, LedgerTransaction, MediaType, Operation, Phase, PreviewKind,
    Progress, PublicationSession, PublishedFileRecord, PublisherError, ResourceHandle,
    RetrievalResult, SourceObject, SubmittedTransaction, TransactionKind, TxDigest,
    BASE_UNITS_PER_COIN, DEFAULT_MAX_FILE_SIZE, DEFAULT_MIN_BALANCE, DEFAULT_RETENTION_EPOCHS,
};
pub use ports::{
    LedgerBackend, MockLedger, MockResourceStore, MockStorageBackend, PublicationApi,
    RecordingReporter, ResourceEvent, ResourceStore, RetrievalApi, StatusReporter,
    StorageBackend,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
