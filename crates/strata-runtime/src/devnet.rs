//! Devnet wiring.
//!
//! Builds the publisher and retrieval services over in-memory devnet backends
//! with the owner account funded from the faucet.

use std::sync::Arc;

use strata_publisher::{
    AccountAddress, DevnetLedger, DevnetStorage, LocalResourceStore, ObjectReader,
    PublicationService, RetrievalService, StatusReporter, TracingStatusReporter,
    WatchStatusReporter,
};
use tracing::info;

use crate::config::{RuntimeConfig, DEVNET_GAS_FEE};
use crate::reporter::MetricsReporter;

/// Publication service over devnet backends.
pub type DevnetPublisher = PublicationService<DevnetStorage, DevnetLedger>;

/// Retrieval service over devnet storage.
pub type DevnetRetrieval = RetrievalService<DevnetStorage, LocalResourceStore>;

/// Every component of a devnet session.
pub struct DevnetStack {
    /// Owner and gas payer.
    pub owner: AccountAddress,
    /// Ledger.
    pub ledger: Arc<DevnetLedger>,
    /// Storage network.
    pub storage: Arc<DevnetStorage>,
    /// Resources held by retrieval.
    pub resources: Arc<LocalResourceStore>,
    /// Observable progress and status.
    pub status: Arc<WatchStatusReporter>,
    /// Publication service.
    pub publisher: Arc<DevnetPublisher>,
    /// Retrieval service.
    pub retrieval: DevnetRetrieval,
    /// File loader honoring the configured size limit.
    pub reader: ObjectReader,
}

impl DevnetStack {
    /// Wire a stack for `owner`, granting it the configured faucet amount.
    pub fn new(config: &RuntimeConfig, owner: AccountAddress) -> Self {
        let ledger = Arc::new(DevnetLedger::new(owner.clone(), DEVNET_GAS_FEE));
        ledger.fund(&owner, config.faucet);
        let storage = Arc::new(DevnetStorage::new(Arc::clone(&ledger), config.shard_count));
        let resources = Arc::new(LocalResourceStore::new(config.download_dir.clone()));

        let status = Arc::new(WatchStatusReporter::new());
        let reporter: Arc<dyn StatusReporter> = Arc::new(
            MetricsReporter::new(status.clone()).with_sink(Arc::new(TracingStatusReporter)),
        );

        let publisher = Arc::new(PublicationService::new(
            config.publisher.clone(),
            Arc::clone(&storage),
            Arc::clone(&ledger),
            Arc::clone(&reporter),
        ));
        let retrieval = RetrievalService::new(Arc::clone(&storage), Arc::clone(&resources), reporter);
        let reader = ObjectReader::new(config.publisher.max_file_size);

        info!(
            owner = %owner,
            faucet = %config.faucet,
            shards = config.shard_count,
            "[strata] Devnet ready"
        );

        Self {
            owner,
            ledger,
            storage,
            resources,
            status,
            publisher,
            retrieval,
            reader,
        }
    }
}
