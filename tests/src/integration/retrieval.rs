//! # Retrieval Scenarios
//!
//! Objects published on the devnet fetched back through the retrieval
//! service into a local resource store.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_publisher::{
        ContentId, FetchSource, FetchedFile, FlowRequest, LocalResourceStore, MediaType,
        MockResourceStore, MockStorageBackend, PreviewKind, PublicationApi, PublisherError,
        RecordingReporter, ResourceEvent, RetrievalApi, RetrievalService,
    };

    use crate::integration::fixtures::{source, DevnetHarness, FlakyStorage};

    async fn publish(h: &DevnetHarness, bytes: &[u8], name: &str) -> ContentId {
        let request = FlowRequest::new(source(bytes, name), 1, h.owner.clone());
        let outcome = h.publisher.run_full_flow(request).await.unwrap();
        outcome.primary_content_id().unwrap().clone()
    }

    fn retrieval(
        h: &DevnetHarness,
        store: Arc<LocalResourceStore>,
    ) -> RetrievalService<FlakyStorage, LocalResourceStore> {
        RetrievalService::new(Arc::clone(&h.storage), store, h.reporter.clone())
    }

    #[tokio::test]
    async fn test_single_slot_over_devnet() {
        let dir = tempfile::tempdir().unwrap();
        let h = DevnetHarness::funded();
        let photo = publish(&h, b"\x89PNG fake", "photo.png").await;
        let notes = publish(&h, b"plain notes", "notes.txt").await;

        let store = Arc::new(LocalResourceStore::new(dir.path()));
        let service = retrieval(&h, Arc::clone(&store));

        let first = service.fetch_by_identifier(photo.as_str()).await.unwrap();
        assert_eq!(first.source, FetchSource::Structured);
        assert_eq!(first.preview_kind(), PreviewKind::Image);
        assert_eq!(store.live_count(), 1);

        let second = service.fetch_by_identifier(notes.as_str()).await.unwrap();
        assert_eq!(second.media_type.as_str(), "text/plain");
        assert_eq!(store.live_count(), 1);
        assert_eq!(service.active().unwrap().content_id, notes);

        // A superseded result no longer owns the slot.
        service.release(&first);
        assert_eq!(store.live_count(), 1);
        assert!(matches!(
            service.download_as(&first, None).await,
            Err(PublisherError::NoActiveResource)
        ));

        let saved = service
            .download_as(&second, Some("../escape.txt"))
            .await
            .unwrap();
        assert_eq!(saved, dir.path().join("escape.txt"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"plain notes");

        service.release(&second);
        assert_eq!(store.live_count(), 0);
        assert!(service.active().is_none());
    }

    #[tokio::test]
    async fn test_raw_blob_fallback_over_devnet() {
        let dir = tempfile::tempdir().unwrap();
        let h = DevnetHarness::funded();
        let id = ContentId::parse("legacy-blob").unwrap();
        h.storage.inner().insert_raw_blob(&id, vec![0xde, 0xad]);

        let service = retrieval(&h, Arc::new(LocalResourceStore::new(dir.path())));
        let result = service.fetch_by_identifier("  legacy-blob ").await.unwrap();

        assert_eq!(result.source, FetchSource::RawBlob);
        assert_eq!(result.media_type, MediaType::octet_stream());
        assert_eq!(result.preview_kind(), PreviewKind::Binary);
        assert!(result.identifier.is_none());

        let saved = service.download_as(&result, Some("   ")).await.unwrap();
        assert_eq!(saved, dir.path().join("legacy-blob.bin"));
        assert_eq!(std::fs::read(saved).unwrap(), vec![0xde, 0xad]);
    }

    #[tokio::test]
    async fn test_unknown_identifier_on_devnet() {
        let dir = tempfile::tempdir().unwrap();
        let h = DevnetHarness::funded();
        let service = retrieval(&h, Arc::new(LocalResourceStore::new(dir.path())));

        let err = service.fetch_by_identifier("never-published").await.unwrap_err();
        assert!(matches!(err, PublisherError::RetrievalError { .. }));
        assert!(service.active().is_none());
    }

    #[tokio::test]
    async fn test_invalid_identifier_never_reaches_backend() {
        let storage = Arc::new(MockStorageBackend::new());
        let store = Arc::new(MockResourceStore::default());
        let reporter = Arc::new(RecordingReporter::default());
        let service = RetrievalService::new(Arc::clone(&storage), Arc::clone(&store), reporter);

        let err = service.fetch_by_identifier("bad id!").await.unwrap_err();

        assert!(matches!(err, PublisherError::InvalidIdentifier(_)));
        assert_eq!(storage.calls().total(), 0);
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_each_supersession_releases_once() {
        let file = |name: &str| FetchedFile {
            bytes: name.as_bytes().to_vec(),
            identifier: Some(format!("{name}.txt")),
            media_type: Some("text/plain".to_string()),
        };
        let storage = Arc::new(
            MockStorageBackend::new()
                .with_file("alpha", file("alpha"))
                .with_file("beta", file("beta")),
        );
        let store = Arc::new(MockResourceStore::default());
        let service = RetrievalService::new(
            storage,
            Arc::clone(&store),
            Arc::new(RecordingReporter::default()),
        );

        let alpha = service.fetch_by_identifier("alpha").await.unwrap();
        service.fetch_by_identifier("beta").await.unwrap();
        assert_eq!(store.release_count(), 1);
        assert_eq!(
            store.events().last(),
            Some(&ResourceEvent::Released(alpha.resource))
        );

        service.fetch_by_identifier("alpha").await.unwrap();
        assert_eq!(store.release_count(), 2);
        assert_eq!(store.live_count(), 1);
    }
}
