//! # Publisher Configuration
//!
//! Limits and defaults applied by the publication service.

use crate::domain::{
    Amount, DEFAULT_MAX_FILE_SIZE, DEFAULT_MIN_BALANCE, DEFAULT_RETENTION_EPOCHS,
};
use serde::{Deserialize, Serialize};

/// Publisher configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Largest accepted source in bytes.
    pub max_file_size: u64,

    /// Balance required before every ledger submission.
    pub min_balance: Amount,

    /// Register objects as deletable by their owner.
    pub deletable: bool,

    /// Retention used when the caller does not choose one.
    pub default_retention_epochs: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            min_balance: Amount::from_base_units(DEFAULT_MIN_BALANCE),
            deletable: true,
            default_retention_epochs: DEFAULT_RETENTION_EPOCHS,
        }
    }
}

impl PublisherConfig {
    /// Create a config for testing (small size ceiling).
    pub fn for_testing() -> Self {
        Self {
            max_file_size: 1024,
            min_balance: Amount::from_base_units(DEFAULT_MIN_BALANCE),
            deletable: true,
            default_retention_epochs: 1,
        }
    }
}
