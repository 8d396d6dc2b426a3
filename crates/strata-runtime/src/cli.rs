//! Command line interface.
//!
//! `strata publish <path>` runs the publication flow against the devnet and
//! optionally fetches the object back.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use strata_publisher::{
    AccountAddress, CancellationSignal, CertifyOutcome, ContentId, FlowFailure, FlowRequest,
    OneClickDriver, Phase, PublicationApi, RetrievalApi, SourceObject, TxDigest,
};
use strata_telemetry::{log_event, log_phase_event, record_retrieval, BYTES_PUBLISHED};
use tracing::warn;

use crate::config::RuntimeConfig;
use crate::devnet::DevnetStack;
use crate::reporter::record_failure;

/// Owner used when `--owner` is not given.
pub const DEFAULT_OWNER: &str = "0xdevnet-owner";

/// Strata: publish files to a ledger-anchored object store
#[derive(Parser, Debug)]
#[command(name = "strata", version)]
#[command(about = "Publish files to a ledger-anchored, erasure-coded object store")]
pub struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long, global = true)]
    pub print_metrics: bool,

    /// Print the publish report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish a file and print its content identifier
    Publish(PublishArgs),
}

/// Arguments of `strata publish`.
#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// File to publish
    pub path: PathBuf,

    /// Retention in storage epochs (defaults to STRATA_EPOCHS)
    #[arg(long)]
    pub epochs: Option<u32>,

    /// Owner account paying for registration and certification
    #[arg(long, default_value = DEFAULT_OWNER)]
    pub owner: String,

    /// Run each phase as a separate call instead of the one-click flow
    #[arg(long)]
    pub step_by_step: bool,

    /// Fetch the published object back and save it
    #[arg(long)]
    pub fetch_back: bool,

    /// Directory for fetched files (overrides STRATA_DOWNLOAD_DIR)
    #[arg(long)]
    pub download_dir: Option<PathBuf>,
}

impl PublishArgs {
    /// Apply flag overrides on top of the environment configuration.
    pub fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(dir) = &self.download_dir {
            config.download_dir = dir.clone();
        }
        if let Some(epochs) = self.epochs {
            config.publisher.default_retention_epochs = epochs;
        }
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    /// Certify transaction digest.
    pub digest: TxDigest,
    /// Content identifier of the primary file, if the backend listed one.
    pub content_id: Option<ContentId>,
    /// Bytes published.
    pub bytes: u64,
    /// Where the fetched copy was saved.
    pub saved: Option<PathBuf>,
}

impl PublishReport {
    /// Plain-text lines for the terminal.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = match &self.content_id {
            Some(id) => vec![id.to_string()],
            None => vec![format!("certified {}", self.digest)],
        };
        if let Some(path) = &self.saved {
            lines.push(format!("saved {}", path.display()));
        }
        lines
    }

    /// JSON rendering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize publish report")
    }
}

/// Publish `args.path` on a fresh devnet.
pub async fn publish(
    args: &PublishArgs,
    mut config: RuntimeConfig,
    cancel: CancellationSignal,
) -> Result<PublishReport> {
    args.apply(&mut config);
    let stack = DevnetStack::new(&config, AccountAddress::new(args.owner.trim()));

    let source = stack
        .reader
        .read(&args.path)
        .await
        .map_err(|e| {
            record_failure(&e);
            e
        })
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let bytes = source.len();
    let epochs = config.publisher.default_retention_epochs;
    log_event!(
        info,
        "cli",
        "Publishing",
        identifier = source.identifier.as_str(),
        bytes = bytes,
        epochs = epochs
    );

    let published = if args.step_by_step {
        publish_step_by_step(&stack, source, epochs, &cancel).await
    } else {
        let request = FlowRequest::new(source, epochs, stack.owner.clone()).with_cancellation(cancel);
        OneClickDriver::new(Arc::clone(&stack.publisher))
            .run(request)
            .await
    };

    let outcome = match published {
        Ok(outcome) => outcome,
        Err(failure) => {
            record_failure(&failure.error);
            warn_abandoned(&failure);
            return Err(anyhow::Error::new(failure).context("Publication failed"));
        }
    };
    BYTES_PUBLISHED.inc_by(bytes as f64);

    let content_id = outcome.primary_content_id().cloned();
    let saved = match (&content_id, args.fetch_back) {
        (Some(id), true) => Some(fetch_back(&stack, id).await?),
        (None, true) => {
            warn!("[strata] Nothing listed for certified object, skipping fetch-back");
            None
        }
        _ => None,
    };

    Ok(PublishReport {
        digest: outcome.digest,
        content_id,
        bytes,
        saved,
    })
}

async fn publish_step_by_step(
    stack: &DevnetStack,
    source: SourceObject,
    epochs: u32,
    cancel: &CancellationSignal,
) -> Result<CertifyOutcome, FlowFailure> {
    let publisher = &stack.publisher;
    let mut session = publisher.encode(source).await?;
    let result = async {
        let digest = publisher.register(&mut session, epochs, &stack.owner).await?;
        publisher.upload(&mut session, Some(&digest), cancel).await?;
        publisher.certify(&mut session).await
    }
    .await;
    result.map_err(|error| FlowFailure {
        error,
        session: Some(session),
    })
}

async fn fetch_back(stack: &DevnetStack, id: &ContentId) -> Result<PathBuf> {
    let fetched = match stack.retrieval.fetch_by_identifier(id.as_str()).await {
        Ok(fetched) => fetched,
        Err(e) => {
            record_retrieval("failed");
            record_failure(&e);
            return Err(e).context("Fetch-back failed");
        }
    };
    record_retrieval(fetched.source.as_str());

    let saved = stack
        .retrieval
        .download_as(&fetched, None)
        .await
        .context("Failed to save fetched object")?;
    stack.retrieval.release(&fetched);
    Ok(saved)
}

/// The process is about to drop a session that paid for registration.
fn warn_abandoned(failure: &FlowFailure) {
    let Some(session) = &failure.session else {
        return;
    };
    if let Some(digest) = session.registration_digest() {
        if session.checkpoint() != Phase::Certified {
            log_phase_event!(
                warn,
                "[strata] Abandoning registered object without cleanup",
                session.checkpoint(),
                session.id(),
                digest = %digest
            );
        }
    }
}
