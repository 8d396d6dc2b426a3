//! Local Resource Store
//!
//! In-memory resources for fetched objects, persisted on demand into a
//! download directory.

use crate::domain::{BackendError, MediaType, ResourceHandle};
use crate::ports::ResourceStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

struct StoredResource {
    bytes: Arc<[u8]>,
    media_type: MediaType,
}

/// Resource store keeping bytes in memory until released.
pub struct LocalResourceStore {
    /// Target directory for `persist`.
    download_dir: PathBuf,
    /// Live resources.
    resources: RwLock<HashMap<ResourceHandle, StoredResource>>,
    /// Next handle id.
    next_id: AtomicU64,
}

impl LocalResourceStore {
    /// Create a store persisting into `download_dir`.
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            resources: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Download directory.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Number of live resources.
    pub fn live_count(&self) -> usize {
        self.resources.read().len()
    }

    /// Bytes and media type of a live resource.
    pub fn contents(&self, handle: ResourceHandle) -> Option<(Arc<[u8]>, MediaType)> {
        self.resources
            .read()
            .get(&handle)
            .map(|r| (Arc::clone(&r.bytes), r.media_type.clone()))
    }
}

/// Reduce a caller-supplied name to a single path component.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let candidate = name.trim().replace('\\', "/");
    Path::new(&candidate)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
}

#[async_trait]
impl ResourceStore for LocalResourceStore {
    fn materialize(
        &self,
        bytes: Vec<u8>,
        media_type: &MediaType,
    ) -> Result<ResourceHandle, BackendError> {
        let handle = ResourceHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(
            resource = handle.id(),
            bytes = bytes.len(),
            "[strata] Materialized resource"
        );
        self.resources.write().insert(
            handle,
            StoredResource {
                bytes: Arc::from(bytes),
                media_type: media_type.clone(),
            },
        );
        Ok(handle)
    }

    fn release(&self, handle: ResourceHandle) {
        if self.resources.write().remove(&handle).is_some() {
            debug!(resource = handle.id(), "[strata] Released resource");
        }
    }

    async fn persist(
        &self,
        handle: ResourceHandle,
        file_name: &str,
    ) -> Result<PathBuf, BackendError> {
        let bytes = self
            .contents(handle)
            .map(|(bytes, _)| bytes)
            .ok_or_else(|| BackendError::NotFound(format!("resource {}", handle.id())))?;
        let name = sanitize_file_name(file_name)
            .ok_or_else(|| BackendError::Failed(format!("invalid file name {file_name:?}")))?;

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| BackendError::Failed(e.to_string()))?;
        let path = self.download_dir.join(name);
        tokio::fs::write(&path, &bytes[..])
            .await
            .map_err(|e| BackendError::Failed(e.to_string()))?;

        info!("[strata] 💾 Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}
