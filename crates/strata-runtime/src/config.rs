//! Runtime configuration loaded from environment variables.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STRATA_MAX_FILE_SIZE` | `104857600` | Largest accepted file in bytes |
//! | `STRATA_MIN_BALANCE` | `0.1` | Balance required before each submission, in coins |
//! | `STRATA_EPOCHS` | `3` | Default retention in storage epochs |
//! | `STRATA_DOWNLOAD_DIR` | `./downloads` | Where retrieved files are saved |
//! | `STRATA_DEVNET_FAUCET` | `10` | Coins granted to the owner on the devnet |
//! | `STRATA_SHARDS` | `10` | Simulated shards per object |

use std::path::PathBuf;

use strata_publisher::{Amount, PublisherConfig, DEFAULT_SHARD_COUNT};
use thiserror::Error;

/// Default devnet faucet grant in whole coins.
pub const DEFAULT_FAUCET_COINS: u64 = 10;

/// Gas charged by the devnet ledger per transaction (0.001 coin).
pub const DEVNET_GAS_FEE: Amount = Amount::from_base_units(1_000_000);

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to an unusable value.
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Publisher limits and defaults.
    pub publisher: PublisherConfig,
    /// Directory retrieved files are written to.
    pub download_dir: PathBuf,
    /// Amount granted to the owner account on startup.
    pub faucet: Amount,
    /// Simulated shards per object.
    pub shard_count: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            publisher: PublisherConfig::default(),
            download_dir: PathBuf::from("downloads"),
            faucet: Amount::from_coins(DEFAULT_FAUCET_COINS),
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason,
    }
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variables. Unset variables keep their
    /// defaults; set but malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("STRATA_MAX_FILE_SIZE") {
            config.publisher.max_file_size = match raw.trim().parse::<u64>() {
                Ok(0) => return Err(invalid("STRATA_MAX_FILE_SIZE", &raw, "must be positive")),
                Ok(size) => size,
                Err(_) => return Err(invalid("STRATA_MAX_FILE_SIZE", &raw, "expected bytes")),
            };
        }

        if let Some(raw) = lookup("STRATA_MIN_BALANCE") {
            config.publisher.min_balance = Amount::parse_coins(&raw)
                .ok_or_else(|| invalid("STRATA_MIN_BALANCE", &raw, "expected a coin amount"))?;
        }

        if let Some(raw) = lookup("STRATA_EPOCHS") {
            config.publisher.default_retention_epochs = parse_positive("STRATA_EPOCHS", &raw)?;
        }

        if let Some(raw) = lookup("STRATA_DOWNLOAD_DIR") {
            if raw.trim().is_empty() {
                return Err(invalid("STRATA_DOWNLOAD_DIR", &raw, "must not be empty"));
            }
            config.download_dir = PathBuf::from(raw);
        }

        if let Some(raw) = lookup("STRATA_DEVNET_FAUCET") {
            config.faucet = Amount::parse_coins(&raw)
                .ok_or_else(|| invalid("STRATA_DEVNET_FAUCET", &raw, "expected a coin amount"))?;
        }

        if let Some(raw) = lookup("STRATA_SHARDS") {
            config.shard_count = parse_positive::<usize>("STRATA_SHARDS", &raw)?;
        }

        Ok(config)
    }
}

fn parse_positive<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value == T::default() => Err(invalid(var, raw, "must be at least 1")),
        Ok(value) => Ok(value),
        Err(_) => Err(invalid(var, raw, "expected a positive integer")),
    }
}
