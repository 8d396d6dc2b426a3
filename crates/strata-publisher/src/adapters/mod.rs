//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits: status reporters, the local resource
//! store, the object reader and the in-memory devnet backends.

mod devnet_ledger;
mod devnet_storage;
mod file_reader;
mod reporter;
mod resource_store;

pub use devnet_ledger::DevnetLedger;
pub use devnet_storage::{DevnetStorage, DEFAULT_SHARD_COUNT};
pub use file_reader::{guess_media_type, ObjectReader};
pub use reporter::{TracingStatusReporter, WatchStatusReporter};
pub use resource_store::{sanitize_file_name, LocalResourceStore};
