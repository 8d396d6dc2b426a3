//! # Strata Test Suite
//!
//! Cross-crate scenarios run against the devnet backends and the mocks.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── publish_benchmarks.rs   # Devnet full-flow throughput
//! └── src/integration/
//!     ├── fixtures.rs             # Devnet harness, flaky backend wrappers
//!     ├── publication.rs          # Phase ordering, retries, cancellation
//!     ├── retrieval.rs            # Fetch paths, single-slot resource
//!     └── runtime.rs              # CLI publish, config, metrics
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p strata-tests
//! cargo test -p strata-tests integration::retrieval::
//! cargo bench -p strata-tests
//! ```

#![allow(dead_code)]

pub mod integration;
