//! # Strata CLI
//!
//! Publishes a local file against in-memory devnet backends.
//!
//! ## Startup Sequence
//!
//! 1. Parse flags
//! 2. Initialize telemetry (logging + metrics) from `STRATA_*` variables
//! 3. Load runtime configuration, flags override
//! 4. Wire the devnet and run the requested command
//!
//! Ctrl-C cancels an upload in progress; the session then fails in the
//! upload phase and nothing else is retried.

use anyhow::{Context, Result};
use clap::Parser;
use strata_publisher::cancellation_pair;
use strata_runtime::{publish, Cli, Command, RuntimeConfig};
use strata_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if cli.verbose {
        telemetry = telemetry.with_log_level("debug");
    }
    let _guard = init_telemetry(telemetry).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("Invalid STRATA_* configuration")?;
    info!("[strata] Strata v{}", strata_runtime::VERSION);

    match &cli.command {
        Command::Publish(args) => {
            let (handle, signal) = cancellation_pair();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("[strata] Interrupt received, cancelling");
                    handle.cancel();
                }
            });

            let report = publish(args, config, signal).await?;
            if cli.json {
                println!("{}", report.to_json()?);
            } else {
                for line in report.lines() {
                    println!("{line}");
                }
            }
        }
    }

    if cli.print_metrics {
        print!("{}", encode_metrics().context("Failed to encode metrics")?);
    }
    Ok(())
}
