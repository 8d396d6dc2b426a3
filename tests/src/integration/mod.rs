//! Integration scenarios.

pub mod fixtures;
mod publication;
mod retrieval;
mod runtime;
