//! # Test Fixtures
//!
//! A devnet harness whose storage can be told to drop uploads, so retry
//! scenarios run against real ledger bookkeeping instead of mocks.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use strata_publisher::{
    guess_media_type, AccountAddress, Amount, BackendError, CancellationSignal, ContentId,
    DevnetLedger, DevnetStorage, EncodedHandle, FetchedFile, LedgerTransaction,
    PublicationService, PublishedFileRecord, PublisherConfig, RecordingReporter, SourceObject,
    StorageBackend, TxDigest,
};

/// Gas fee charged by the harness ledger.
pub const GAS_FEE: Amount = Amount::from_base_units(1_000);

/// Shards per upload on the harness storage.
pub const SHARDS: usize = 4;

#[derive(Default)]
struct FlakyState {
    failing_uploads: u32,
    encodes: u32,
    uploads: u32,
}

/// Devnet storage that can fail the next N uploads.
pub struct FlakyStorage {
    inner: Arc<DevnetStorage>,
    state: Mutex<FlakyState>,
}

impl FlakyStorage {
    /// Wrap a devnet storage network.
    pub fn new(inner: Arc<DevnetStorage>, failing_uploads: u32) -> Self {
        Self {
            inner,
            state: Mutex::new(FlakyState {
                failing_uploads,
                ..Default::default()
            }),
        }
    }

    /// Wrapped storage.
    pub fn inner(&self) -> &Arc<DevnetStorage> {
        &self.inner
    }

    /// `encode` calls so far.
    pub fn encode_calls(&self) -> u32 {
        self.state.lock().encodes
    }

    /// `upload_shards` calls so far.
    pub fn upload_calls(&self) -> u32 {
        self.state.lock().uploads
    }
}

#[async_trait]
impl StorageBackend for FlakyStorage {
    async fn encode(&self, source: &SourceObject) -> Result<EncodedHandle, BackendError> {
        self.state.lock().encodes += 1;
        self.inner.encode(source).await
    }

    async fn build_register_tx(
        &self,
        handle: &EncodedHandle,
        epochs: u32,
        owner: &AccountAddress,
        deletable: bool,
    ) -> Result<LedgerTransaction, BackendError> {
        self.inner
            .build_register_tx(handle, epochs, owner, deletable)
            .await
    }

    async fn upload_shards(
        &self,
        handle: &EncodedHandle,
        registration: &TxDigest,
        on_progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationSignal,
    ) -> Result<(), BackendError> {
        let fail = {
            let mut state = self.state.lock();
            state.uploads += 1;
            let fail = state.failing_uploads > 0;
            if fail {
                state.failing_uploads -= 1;
            }
            fail
        };
        if fail {
            on_progress(0.3);
            return Err(BackendError::Network("storage node 3 timed out".to_string()));
        }
        self.inner
            .upload_shards(handle, registration, on_progress, cancel)
            .await
    }

    async fn build_certify_tx(
        &self,
        handle: &EncodedHandle,
    ) -> Result<LedgerTransaction, BackendError> {
        self.inner.build_certify_tx(handle).await
    }

    async fn list_published_files(
        &self,
        handle: &EncodedHandle,
    ) -> Result<Vec<PublishedFileRecord>, BackendError> {
        self.inner.list_published_files(handle).await
    }

    async fn fetch_by_identifier(&self, id: &ContentId) -> Result<FetchedFile, BackendError> {
        self.inner.fetch_by_identifier(id).await
    }

    async fn read_raw_blob(&self, id: &ContentId) -> Result<Vec<u8>, BackendError> {
        self.inner.read_raw_blob(id).await
    }
}

/// Publication service over the harness backends.
pub type HarnessPublisher = PublicationService<FlakyStorage, DevnetLedger>;

/// Devnet with a funded owner and a recording reporter.
pub struct DevnetHarness {
    /// Owner and gas payer.
    pub owner: AccountAddress,
    /// Ledger.
    pub ledger: Arc<DevnetLedger>,
    /// Storage wrapper.
    pub storage: Arc<FlakyStorage>,
    /// Everything the services reported.
    pub reporter: Arc<RecordingReporter>,
    /// Publication service.
    pub publisher: Arc<HarnessPublisher>,
}

impl DevnetHarness {
    /// Owner funded with `balance`; the first `failing_uploads` uploads fail.
    pub fn new(balance: Amount, failing_uploads: u32) -> Self {
        let owner = AccountAddress::new("0xintegration");
        let ledger = Arc::new(DevnetLedger::new(owner.clone(), GAS_FEE));
        ledger.fund(&owner, balance);
        let devnet = Arc::new(DevnetStorage::new(Arc::clone(&ledger), SHARDS));
        let storage = Arc::new(FlakyStorage::new(devnet, failing_uploads));
        let reporter = Arc::new(RecordingReporter::default());
        let publisher = Arc::new(PublicationService::new(
            PublisherConfig::default(),
            Arc::clone(&storage),
            Arc::clone(&ledger),
            reporter.clone(),
        ));
        Self {
            owner,
            ledger,
            storage,
            reporter,
            publisher,
        }
    }

    /// Owner holding one coin, reliable storage.
    pub fn funded() -> Self {
        Self::new(Amount::from_coins(1), 0)
    }
}

/// Source object named `name`, typed by its extension.
pub fn source(bytes: &[u8], name: &str) -> SourceObject {
    SourceObject::new(bytes.to_vec(), name, guess_media_type(Path::new(name)))
}
