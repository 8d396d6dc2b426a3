//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod driver;
pub mod publication;
pub mod retrieval;

pub use driver::{failure_message, OneClickDriver};
pub use publication::PublicationService;
pub use retrieval::RetrievalService;
