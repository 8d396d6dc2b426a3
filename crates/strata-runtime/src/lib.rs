//! # Strata Runtime
//!
//! Configuration, devnet wiring and the command line front end for the
//! Strata publisher.
//!
//! ## Module Structure
//!
//! ```text
//! strata-runtime/
//! ├── config.rs    # RuntimeConfig from STRATA_* variables
//! ├── reporter.rs  # MetricsReporter, failure metrics
//! ├── devnet.rs    # DevnetStack: backends + services
//! ├── cli.rs       # clap definitions, publish command
//! └── main.rs      # `strata` binary
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod devnet;
pub mod reporter;

pub use cli::{publish, Cli, Command, PublishArgs, PublishReport, DEFAULT_OWNER};
pub use config::{ConfigError, RuntimeConfig, DEFAULT_FAUCET_COINS, DEVNET_GAS_FEE};
pub use devnet::{DevnetPublisher, DevnetRetrieval, DevnetStack};
pub use reporter::{record_failure, MetricsReporter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
