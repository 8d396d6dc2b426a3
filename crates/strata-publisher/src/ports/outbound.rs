//! # Outbound Ports
//!
//! Traits for external dependencies (storage nodes, ledger, local resources,
//! status sinks).

use crate::domain::{
    AccountAddress, Amount, BackendError, CancellationSignal, ContentId, EncodedHandle,
    FetchedFile, LedgerTransaction, MediaType, Phase, Progress, PublishedFileRecord,
    ResourceHandle, SourceObject, SubmittedTransaction, TransactionKind, TxDigest,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

/// Storage-node network - outbound port.
///
/// Encoding, shard transport and transaction construction are opaque to the
/// engine; it only threads the returned handle back in.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Erasure-encode the source.
    async fn encode(&self, source: &SourceObject) -> Result<EncodedHandle, BackendError>;

    /// Build the registration transaction for an encoded object.
    async fn build_register_tx(
        &self,
        handle: &EncodedHandle,
        epochs: u32,
        owner: &AccountAddress,
        deletable: bool,
    ) -> Result<LedgerTransaction, BackendError>;

    /// Push shards to storage nodes, reporting progress in `[0.0, 1.0]`.
    async fn upload_shards(
        &self,
        handle: &EncodedHandle,
        registration: &TxDigest,
        on_progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationSignal,
    ) -> Result<(), BackendError>;

    /// Build the certify transaction for an uploaded object.
    async fn build_certify_tx(&self, handle: &EncodedHandle)
        -> Result<LedgerTransaction, BackendError>;

    /// Files published for a certified object.
    async fn list_published_files(
        &self,
        handle: &EncodedHandle,
    ) -> Result<Vec<PublishedFileRecord>, BackendError>;

    /// Structured fetch with metadata.
    async fn fetch_by_identifier(&self, id: &ContentId) -> Result<FetchedFile, BackendError>;

    /// Raw blob read without metadata.
    async fn read_raw_blob(&self, id: &ContentId) -> Result<Vec<u8>, BackendError>;
}

/// Ledger network - outbound port.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Spendable balance of `account`.
    async fn get_balance(&self, account: &AccountAddress) -> Result<Amount, BackendError>;

    /// Sign and broadcast a transaction.
    async fn sign_and_submit(
        &self,
        tx: LedgerTransaction,
    ) -> Result<SubmittedTransaction, BackendError>;
}

/// Revocable local resources for fetched bytes.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Make `bytes` available locally.
    fn materialize(
        &self,
        bytes: Vec<u8>,
        media_type: &MediaType,
    ) -> Result<ResourceHandle, BackendError>;

    /// Revoke a resource. Unknown handles are ignored.
    fn release(&self, handle: ResourceHandle);

    /// Write a resource to disk under `file_name`.
    async fn persist(&self, handle: ResourceHandle, file_name: &str)
        -> Result<PathBuf, BackendError>;
}

/// Passive sink for progress and status lines.
pub trait StatusReporter: Send + Sync {
    /// Phase progress update.
    fn report_progress(&self, progress: Progress);

    /// Human-readable status line.
    fn report_status(&self, status: &str);
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Call counters recorded by [`MockStorageBackend`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MockStorageCalls {
    /// `encode` calls.
    pub encode: u32,
    /// `build_register_tx` calls.
    pub register_builds: u32,
    /// `upload_shards` calls.
    pub uploads: u32,
    /// `build_certify_tx` calls.
    pub certify_builds: u32,
    /// `list_published_files` calls.
    pub listings: u32,
    /// `fetch_by_identifier` calls.
    pub structured_fetches: u32,
    /// `read_raw_blob` calls.
    pub raw_reads: u32,
}

impl MockStorageCalls {
    /// Sum of every counter.
    pub fn total(&self) -> u32 {
        self.encode
            + self.register_builds
            + self.uploads
            + self.certify_builds
            + self.listings
            + self.structured_fetches
            + self.raw_reads
    }
}

#[derive(Default)]
struct MockStorageState {
    calls: MockStorageCalls,
    fail_encode: bool,
    failing_uploads: u32,
    hang_upload: bool,
    failing_listings: u32,
    fail_structured: bool,
    fail_raw: bool,
    files: HashMap<String, FetchedFile>,
    last_register: Option<(u32, AccountAddress, bool)>,
}

/// Mock storage backend for testing.
pub struct MockStorageBackend {
    state: Mutex<MockStorageState>,
    encode_gate: Option<Arc<Notify>>,
    progress_steps: Vec<f64>,
}

impl Default for MockStorageBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorageBackend {
    /// Backend where every call succeeds.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockStorageState::default()),
            encode_gate: None,
            progress_steps: vec![0.25, 0.5, 0.75, 1.0],
        }
    }

    /// Encode always fails.
    pub fn failing_encode(mut self) -> Self {
        self.state.get_mut().fail_encode = true;
        self
    }

    /// The next `times` uploads fail with a network error.
    pub fn failing_uploads(mut self, times: u32) -> Self {
        self.state.get_mut().failing_uploads = times;
        self
    }

    /// Uploads block until cancelled.
    pub fn hanging_upload(mut self) -> Self {
        self.state.get_mut().hang_upload = true;
        self
    }

    /// The next `times` listings fail.
    pub fn failing_listings(mut self, times: u32) -> Self {
        self.state.get_mut().failing_listings = times;
        self
    }

    /// Structured fetches fail.
    pub fn failing_structured_fetch(mut self) -> Self {
        self.state.get_mut().fail_structured = true;
        self
    }

    /// Raw reads fail.
    pub fn failing_raw_read(mut self) -> Self {
        self.state.get_mut().fail_raw = true;
        self
    }

    /// Progress fractions reported by each upload.
    pub fn with_progress_steps(mut self, steps: Vec<f64>) -> Self {
        self.progress_steps = steps;
        self
    }

    /// Encode waits for a permit on `gate` before returning.
    pub fn with_encode_gate(mut self, gate: Arc<Notify>) -> Self {
        self.encode_gate = Some(gate);
        self
    }

    /// Serve `file` for `id` on both retrieval paths.
    pub fn with_file(mut self, id: &str, file: FetchedFile) -> Self {
        self.state.get_mut().files.insert(id.to_string(), file);
        self
    }

    /// Snapshot of call counters.
    pub fn calls(&self) -> MockStorageCalls {
        self.state.lock().calls
    }

    /// Parameters of the last register build: epochs, owner, deletable.
    pub fn last_register(&self) -> Option<(u32, AccountAddress, bool)> {
        self.state.lock().last_register.clone()
    }
}

#[async_trait]
impl StorageBackend for MockStorageBackend {
    async fn encode(&self, source: &SourceObject) -> Result<EncodedHandle, BackendError> {
        let fail = {
            let mut state = self.state.lock();
            state.calls.encode += 1;
            state.fail_encode
        };
        if let Some(gate) = &self.encode_gate {
            gate.notified().await;
        }
        if fail {
            return Err(BackendError::Failed("Mock encode failure".to_string()));
        }
        Ok(EncodedHandle::new(format!("mock:{}", source.identifier)))
    }

    async fn build_register_tx(
        &self,
        handle: &EncodedHandle,
        epochs: u32,
        owner: &AccountAddress,
        deletable: bool,
    ) -> Result<LedgerTransaction, BackendError> {
        let mut state = self.state.lock();
        state.calls.register_builds += 1;
        state.last_register = Some((epochs, owner.clone(), deletable));
        Ok(LedgerTransaction::new(
            TransactionKind::Register,
            handle.token().as_bytes(),
        ))
    }

    async fn upload_shards(
        &self,
        _handle: &EncodedHandle,
        _registration: &TxDigest,
        on_progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationSignal,
    ) -> Result<(), BackendError> {
        let (hang, fail) = {
            let mut state = self.state.lock();
            state.calls.uploads += 1;
            let fail = state.failing_uploads > 0;
            if fail {
                state.failing_uploads -= 1;
            }
            (state.hang_upload, fail)
        };
        if hang {
            cancel.cancelled().await;
            return Err(BackendError::Cancelled);
        }
        for step in &self.progress_steps {
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            on_progress(*step);
        }
        if fail {
            return Err(BackendError::Network("storage node unreachable".to_string()));
        }
        Ok(())
    }

    async fn build_certify_tx(
        &self,
        handle: &EncodedHandle,
    ) -> Result<LedgerTransaction, BackendError> {
        self.state.lock().calls.certify_builds += 1;
        Ok(LedgerTransaction::new(
            TransactionKind::Certify,
            handle.token().as_bytes(),
        ))
    }

    async fn list_published_files(
        &self,
        handle: &EncodedHandle,
    ) -> Result<Vec<PublishedFileRecord>, BackendError> {
        let mut state = self.state.lock();
        state.calls.listings += 1;
        if state.failing_listings > 0 {
            state.failing_listings -= 1;
            return Err(BackendError::Network("listing unavailable".to_string()));
        }
        let content_id =
            ContentId::parse("mock-blob").map_err(|e| BackendError::Failed(e.to_string()))?;
        let identifier = handle.token().trim_start_matches("mock:").to_string();
        Ok(vec![PublishedFileRecord {
            content_id,
            identifier: Some(identifier),
            tags: BTreeMap::new(),
        }])
    }

    async fn fetch_by_identifier(&self, id: &ContentId) -> Result<FetchedFile, BackendError> {
        let mut state = self.state.lock();
        state.calls.structured_fetches += 1;
        if state.fail_structured {
            return Err(BackendError::Network("Mock structured fetch failure".to_string()));
        }
        state
            .files
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    async fn read_raw_blob(&self, id: &ContentId) -> Result<Vec<u8>, BackendError> {
        let mut state = self.state.lock();
        state.calls.raw_reads += 1;
        if state.fail_raw {
            return Err(BackendError::Network("Mock raw read failure".to_string()));
        }
        state
            .files
            .get(id.as_str())
            .map(|f| f.bytes.clone())
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }
}

#[derive(Default)]
struct MockLedgerState {
    balance: Amount,
    failing_balance_queries: u32,
    rejections: HashMap<TransactionKind, u32>,
    submitted: Vec<LedgerTransaction>,
    balance_queries: u32,
}

/// Mock ledger for testing.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<MockLedgerState>,
}

impl MockLedger {
    /// Ledger where every account holds `balance`.
    pub fn with_balance(balance: Amount) -> Self {
        Self {
            state: Mutex::new(MockLedgerState {
                balance,
                ..Default::default()
            }),
        }
    }

    /// Reject the next `times` submissions of `kind`.
    pub fn rejecting(mut self, kind: TransactionKind, times: u32) -> Self {
        self.state.get_mut().rejections.insert(kind, times);
        self
    }

    /// Fail the next `times` balance queries.
    pub fn failing_balance_queries(mut self, times: u32) -> Self {
        self.state.get_mut().failing_balance_queries = times;
        self
    }

    /// Change the balance between phases.
    pub fn set_balance(&self, balance: Amount) {
        self.state.lock().balance = balance;
    }

    /// Every accepted transaction, in order.
    pub fn submitted(&self) -> Vec<LedgerTransaction> {
        self.state.lock().submitted.clone()
    }

    /// Accepted transactions of `kind`.
    pub fn submitted_count(&self, kind: TransactionKind) -> usize {
        self.state
            .lock()
            .submitted
            .iter()
            .filter(|tx| tx.kind == kind)
            .count()
    }

    /// Number of balance queries served.
    pub fn balance_queries(&self) -> u32 {
        self.state.lock().balance_queries
    }
}

#[async_trait]
impl LedgerBackend for MockLedger {
    async fn get_balance(&self, _account: &AccountAddress) -> Result<Amount, BackendError> {
        let mut state = self.state.lock();
        state.balance_queries += 1;
        if state.failing_balance_queries > 0 {
            state.failing_balance_queries -= 1;
            return Err(BackendError::Network("Mock RPC timeout".to_string()));
        }
        Ok(state.balance)
    }

    async fn sign_and_submit(
        &self,
        tx: LedgerTransaction,
    ) -> Result<SubmittedTransaction, BackendError> {
        let mut state = self.state.lock();
        if let Some(remaining) = state.rejections.get_mut(&tx.kind) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BackendError::Rejected("user rejected signature".to_string()));
            }
        }
        let digest = TxDigest::new(format!("mock-{}-{}", tx.kind, state.submitted.len()));
        state.submitted.push(tx);
        Ok(SubmittedTransaction { digest })
    }
}

/// Lifecycle event recorded by [`MockResourceStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceEvent {
    /// Resource created.
    Materialized(ResourceHandle),
    /// Resource revoked.
    Released(ResourceHandle),
}

#[derive(Default)]
struct MockResourceState {
    next_id: u64,
    live: HashMap<ResourceHandle, Vec<u8>>,
    events: Vec<ResourceEvent>,
    fail_materialize: bool,
}

/// Mock resource store for testing.
#[derive(Default)]
pub struct MockResourceStore {
    state: Mutex<MockResourceState>,
}

impl MockResourceStore {
    /// Store that refuses to materialize.
    pub fn failing() -> Self {
        let store = Self::default();
        store.state.lock().fail_materialize = true;
        store
    }

    /// Ordered lifecycle events.
    pub fn events(&self) -> Vec<ResourceEvent> {
        self.state.lock().events.clone()
    }

    /// Number of releases of live resources.
    pub fn release_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, ResourceEvent::Released(_)))
            .count()
    }

    /// Resources currently live.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }
}

#[async_trait]
impl ResourceStore for MockResourceStore {
    fn materialize(
        &self,
        bytes: Vec<u8>,
        _media_type: &MediaType,
    ) -> Result<ResourceHandle, BackendError> {
        let mut state = self.state.lock();
        if state.fail_materialize {
            return Err(BackendError::Failed("Mock materialize failure".to_string()));
        }
        state.next_id += 1;
        let handle = ResourceHandle::new(state.next_id);
        state.live.insert(handle, bytes);
        state.events.push(ResourceEvent::Materialized(handle));
        Ok(handle)
    }

    fn release(&self, handle: ResourceHandle) {
        let mut state = self.state.lock();
        if state.live.remove(&handle).is_some() {
            state.events.push(ResourceEvent::Released(handle));
        }
    }

    async fn persist(
        &self,
        handle: ResourceHandle,
        file_name: &str,
    ) -> Result<PathBuf, BackendError> {
        let state = self.state.lock();
        if !state.live.contains_key(&handle) {
            return Err(BackendError::NotFound(format!("resource {}", handle.id())));
        }
        Ok(PathBuf::from("/mock-downloads").join(file_name))
    }
}

/// Reporter that records everything it receives.
#[derive(Default)]
pub struct RecordingReporter {
    progress: Mutex<Vec<Progress>>,
    statuses: Mutex<Vec<String>>,
}

impl RecordingReporter {
    /// Every progress update.
    pub fn progress(&self) -> Vec<Progress> {
        self.progress.lock().clone()
    }

    /// Distinct phases in the order they were first reported consecutively.
    pub fn phases(&self) -> Vec<Phase> {
        let mut phases: Vec<Phase> = self.progress.lock().iter().map(|p| p.phase).collect();
        phases.dedup();
        phases
    }

    /// Every status line.
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().clone()
    }

    /// Most recent status line.
    pub fn last_status(&self) -> Option<String> {
        self.statuses.lock().last().cloned()
    }
}

impl StatusReporter for RecordingReporter {
    fn report_progress(&self, progress: Progress) {
        self.progress.lock().push(progress);
    }

    fn report_status(&self, status: &str) {
        self.statuses.lock().push(status.to_string());
    }
}
