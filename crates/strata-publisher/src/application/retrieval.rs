//! # Retrieval Service
//!
//! Resolves content identifiers to locally held resources. At most one
//! resource is held at a time; acquiring a new one releases the previous.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{
    ContentId, FetchSource, MediaType, PublisherError, RetrievalResult,
};
use crate::ports::{ResourceStore, RetrievalApi, StatusReporter, StorageBackend};

/// Retrieval Service - structured fetch with raw-blob fallback.
pub struct RetrievalService<S: ?Sized = dyn StorageBackend, R: ?Sized = dyn ResourceStore> {
    /// Storage-node backend.
    storage: Arc<S>,
    /// Local resource store.
    resources: Arc<R>,
    /// Status sink.
    reporter: Arc<dyn StatusReporter>,
    /// The single held result.
    held: Mutex<Option<RetrievalResult>>,
}

impl<S, R> RetrievalService<S, R>
where
    S: StorageBackend + ?Sized,
    R: ResourceStore + ?Sized,
{
    /// Create a new retrieval service.
    pub fn new(storage: Arc<S>, resources: Arc<R>, reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            storage,
            resources,
            reporter,
            held: Mutex::new(None),
        }
    }

    fn owns_slot(held: &Option<RetrievalResult>, result: &RetrievalResult) -> bool {
        held.as_ref()
            .is_some_and(|current| current.resource == result.resource)
    }

    fn retrieval_error(&self, content_id: &ContentId, cause: String) -> PublisherError {
        let err = PublisherError::RetrievalError {
            content_id: content_id.clone(),
            cause,
        };
        tracing::warn!(content_id = %content_id, "[strata] {}", err);
        self.reporter.report_status(&err.to_string());
        err
    }
}

#[async_trait]
impl<S, R> RetrievalApi for RetrievalService<S, R>
where
    S: StorageBackend + ?Sized + 'static,
    R: ResourceStore + ?Sized + 'static,
{
    async fn fetch_by_identifier(&self, raw_id: &str) -> Result<RetrievalResult, PublisherError> {
        let content_id = match ContentId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                self.reporter.report_status(&e.to_string());
                return Err(e);
            }
        };
        self.reporter
            .report_status(&format!("Fetching {content_id}..."));

        let (bytes, media_type, identifier, source) =
            match self.storage.fetch_by_identifier(&content_id).await {
                Ok(file) => (
                    file.bytes,
                    MediaType::from_tag(file.media_type),
                    file.identifier,
                    FetchSource::Structured,
                ),
                Err(primary) => {
                    tracing::debug!(
                        content_id = %content_id,
                        "[strata] Structured fetch failed ({}), reading raw blob",
                        primary
                    );
                    match self.storage.read_raw_blob(&content_id).await {
                        Ok(bytes) => (bytes, MediaType::octet_stream(), None, FetchSource::RawBlob),
                        Err(fallback) => {
                            return Err(self.retrieval_error(&content_id, fallback.to_string()))
                        }
                    }
                }
            };

        let byte_length = bytes.len() as u64;
        let result = {
            let mut held = self.held.lock();
            let resource = match self.resources.materialize(bytes, &media_type) {
                Ok(resource) => resource,
                Err(e) => {
                    drop(held);
                    return Err(self.retrieval_error(&content_id, e.to_string()));
                }
            };
            if let Some(previous) = held.take() {
                self.resources.release(previous.resource);
            }
            let result = RetrievalResult {
                content_id,
                media_type,
                byte_length,
                identifier,
                source,
                resource,
            };
            *held = Some(result.clone());
            result
        };

        tracing::info!(
            content_id = %result.content_id,
            bytes = result.byte_length,
            source = ?result.source,
            "[strata] Retrieved"
        );
        self.reporter.report_status(&format!(
            "Fetched {} ({} bytes, {})",
            result.content_id, result.byte_length, result.media_type
        ));
        Ok(result)
    }

    fn release(&self, result: &RetrievalResult) {
        let mut held = self.held.lock();
        if Self::owns_slot(&held, result) {
            if let Some(current) = held.take() {
                self.resources.release(current.resource);
                self.reporter.report_status("Preview cleared");
            }
        }
    }

    async fn download_as(
        &self,
        result: &RetrievalResult,
        file_name: Option<&str>,
    ) -> Result<PathBuf, PublisherError> {
        let resource = {
            let held = self.held.lock();
            if !Self::owns_slot(&held, result) {
                return Err(PublisherError::NoActiveResource);
            }
            result.resource
        };

        let name = file_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                result
                    .identifier
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| result.default_file_name());

        match self.resources.persist(resource, &name).await {
            Ok(path) => {
                self.reporter
                    .report_status(&format!("Saved {}", path.display()));
                Ok(path)
            }
            Err(e) => Err(self.retrieval_error(&result.content_id, e.to_string())),
        }
    }

    fn active(&self) -> Option<RetrievalResult> {
        self.held.lock().clone()
    }
}
