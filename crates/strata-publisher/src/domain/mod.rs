//! # Domain Module
//!
//! Core domain types for publication and retrieval.

pub mod cancellation;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod value_objects;

pub use cancellation::{cancellation_pair, CancellationHandle, CancellationSignal};
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use value_objects::*;
