//! Devnet Storage
//!
//! In-memory storage-node network implementing `StorageBackend`. Objects are
//! addressed by the SHA-256 of their bytes; shard fan-out is simulated with
//! per-shard progress. Registration and certification are checked against a
//! [`DevnetLedger`].

use super::devnet_ledger::DevnetLedger;
use crate::domain::{
    AccountAddress, BackendError, CancellationSignal, ContentId, EncodedHandle, FetchedFile,
    LedgerTransaction, MediaType, PublishedFileRecord, SourceObject, TransactionKind, TxDigest,
    CONTENT_TYPE_TAG,
};
use crate::ports::StorageBackend;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of simulated shards per object.
pub const DEFAULT_SHARD_COUNT: usize = 10;

struct EncodedObject {
    blob_id: String,
    bytes: Arc<[u8]>,
    identifier: String,
    content_type: MediaType,
    uploaded: bool,
}

#[derive(Default)]
struct StorageState {
    encoded: HashMap<String, EncodedObject>,
    published: HashMap<String, FetchedFile>,
    raw_blobs: HashMap<String, Vec<u8>>,
    next_handle: u64,
}

/// In-memory storage network.
pub struct DevnetStorage {
    /// Ledger consulted for registration and certification.
    ledger: Arc<DevnetLedger>,
    /// Shards per upload.
    shard_count: usize,
    state: RwLock<StorageState>,
}

impl DevnetStorage {
    /// Create a storage network anchored on `ledger`.
    pub fn new(ledger: Arc<DevnetLedger>, shard_count: usize) -> Self {
        Self {
            ledger,
            shard_count: shard_count.max(1),
            state: RwLock::new(StorageState::default()),
        }
    }

    /// Content identifier the devnet assigns to `bytes`.
    pub fn blob_id(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    /// Store a blob readable only through the raw path.
    pub fn insert_raw_blob(&self, id: &ContentId, bytes: Vec<u8>) {
        self.state
            .write()
            .raw_blobs
            .insert(id.as_str().to_string(), bytes);
    }

    /// Number of certified objects.
    pub fn published_count(&self) -> usize {
        self.state.read().published.len()
    }

    fn blob_for(&self, handle: &EncodedHandle) -> Result<String, BackendError> {
        self.state
            .read()
            .encoded
            .get(handle.token())
            .map(|o| o.blob_id.clone())
            .ok_or_else(|| BackendError::NotFound(format!("encoded handle {}", handle.token())))
    }
}

#[async_trait]
impl StorageBackend for DevnetStorage {
    async fn encode(&self, source: &SourceObject) -> Result<EncodedHandle, BackendError> {
        let blob_id = Self::blob_id(&source.bytes);
        let mut state = self.state.write();
        state.next_handle += 1;
        let token = format!("{}-{}", blob_id, state.next_handle);
        state.encoded.insert(
            token.clone(),
            EncodedObject {
                blob_id,
                bytes: Arc::clone(&source.bytes),
                identifier: source.identifier.clone(),
                content_type: source.content_type.clone(),
                uploaded: false,
            },
        );
        debug!(handle = %token, shards = self.shard_count, "[strata] Devnet encoded");
        Ok(EncodedHandle::new(token))
    }

    async fn build_register_tx(
        &self,
        handle: &EncodedHandle,
        epochs: u32,
        owner: &AccountAddress,
        deletable: bool,
    ) -> Result<LedgerTransaction, BackendError> {
        let blob_id = self.blob_for(handle)?;
        let payload = format!("register:{blob_id}:{epochs}:{owner}:{deletable}");
        Ok(LedgerTransaction::new(
            TransactionKind::Register,
            payload.into_bytes(),
        ))
    }

    async fn upload_shards(
        &self,
        handle: &EncodedHandle,
        registration: &TxDigest,
        on_progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationSignal,
    ) -> Result<(), BackendError> {
        let blob_id = self.blob_for(handle)?;
        let covers_blob = self.ledger.lookup(registration).is_some_and(|tx| {
            tx.kind == TransactionKind::Register
                && tx.payload.starts_with(format!("register:{blob_id}:").as_bytes())
        });
        if !covers_blob {
            return Err(BackendError::Rejected(format!(
                "registration {registration} does not cover blob {blob_id}"
            )));
        }

        for shard in 0..self.shard_count {
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            tokio::task::yield_now().await;
            on_progress((shard + 1) as f64 / self.shard_count as f64);
        }

        if let Some(object) = self.state.write().encoded.get_mut(handle.token()) {
            object.uploaded = true;
        }
        Ok(())
    }

    async fn build_certify_tx(
        &self,
        handle: &EncodedHandle,
    ) -> Result<LedgerTransaction, BackendError> {
        let state = self.state.read();
        let object = state
            .encoded
            .get(handle.token())
            .ok_or_else(|| BackendError::NotFound(format!("encoded handle {}", handle.token())))?;
        if !object.uploaded {
            return Err(BackendError::Failed(format!(
                "blob {} has no uploaded shards",
                object.blob_id
            )));
        }
        let payload = format!("certify:{}", object.blob_id);
        Ok(LedgerTransaction::new(
            TransactionKind::Certify,
            payload.into_bytes(),
        ))
    }

    async fn list_published_files(
        &self,
        handle: &EncodedHandle,
    ) -> Result<Vec<PublishedFileRecord>, BackendError> {
        let mut state = self.state.write();
        let object = state
            .encoded
            .get(handle.token())
            .ok_or_else(|| BackendError::NotFound(format!("encoded handle {}", handle.token())))?;
        let certify_payload = format!("certify:{}", object.blob_id);
        if !self
            .ledger
            .contains_payload(TransactionKind::Certify, certify_payload.as_bytes())
        {
            return Err(BackendError::Failed(format!(
                "blob {} is not certified",
                object.blob_id
            )));
        }

        let content_id =
            ContentId::parse(&object.blob_id).map_err(|e| BackendError::Failed(e.to_string()))?;
        let identifier = object.identifier.clone();
        let content_type = object.content_type.clone();
        let file = FetchedFile {
            bytes: object.bytes.to_vec(),
            identifier: Some(identifier.clone()),
            media_type: Some(content_type.as_str().to_string()),
        };
        state.published.insert(content_id.as_str().to_string(), file);
        info!(content_id = %content_id, "[strata] Devnet object certified");

        let mut tags = BTreeMap::new();
        tags.insert(CONTENT_TYPE_TAG.to_string(), content_type.as_str().to_string());
        Ok(vec![PublishedFileRecord {
            content_id,
            identifier: Some(identifier),
            tags,
        }])
    }

    async fn fetch_by_identifier(&self, id: &ContentId) -> Result<FetchedFile, BackendError> {
        self.state
            .read()
            .published
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("no published file {id}")))
    }

    async fn read_raw_blob(&self, id: &ContentId) -> Result<Vec<u8>, BackendError> {
        let state = self.state.read();
        state
            .published
            .get(id.as_str())
            .map(|f| f.bytes.clone())
            .or_else(|| state.raw_blobs.get(id.as_str()).cloned())
            .ok_or_else(|| BackendError::NotFound(format!("no blob {id}")))
    }
}
