//! # Publication Scenarios
//!
//! The publication state machine against the devnet ledger and storage:
//! phase ordering, precondition failures, retries and cancellation.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_publisher::{
        cancellation_pair, Amount, CancellationSignal, FlowRequest, MediaType, MockLedger,
        MockStorageBackend, OneClickDriver, Operation, Phase, PublicationApi, PublicationService,
        PublisherConfig, PublisherError, RecordingReporter, SourceObject, TransactionKind,
        TxDigest,
    };
    use tokio::sync::Notify;

    use crate::integration::fixtures::{source, DevnetHarness};

    const FORWARD_PATH: [Phase; 8] = [
        Phase::Encoding,
        Phase::Encoded,
        Phase::Registering,
        Phase::Registered,
        Phase::Uploading,
        Phase::Uploaded,
        Phase::Certifying,
        Phase::Certified,
    ];

    // =========================================================================
    // PHASE ORDERING
    // =========================================================================

    #[tokio::test]
    async fn test_full_flow_walks_forward_path() {
        let h = DevnetHarness::funded();
        let request = FlowRequest::new(source(b"forward path", "notes.txt"), 2, h.owner.clone());

        let outcome = h.publisher.run_full_flow(request).await.unwrap();

        assert_eq!(h.reporter.phases(), FORWARD_PATH.to_vec());
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(h.ledger.transaction_count(TransactionKind::Register), 1);
        assert_eq!(h.ledger.transaction_count(TransactionKind::Certify), 1);

        let upload_percents: Vec<u8> = h
            .reporter
            .progress()
            .iter()
            .filter(|p| p.phase == Phase::Uploading)
            .map(|p| p.percent)
            .collect();
        assert_eq!(upload_percents, vec![0, 25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn test_register_outside_encoded_leaves_phase() {
        let h = DevnetHarness::funded();
        let mut session = h.publisher.encode(source(b"twice", "a.bin")).await.unwrap();
        h.publisher
            .register(&mut session, 1, &h.owner)
            .await
            .unwrap();

        let err = h
            .publisher
            .register(&mut session, 1, &h.owner)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublisherError::InvalidPhaseTransition {
                operation: Operation::Register,
                from: Phase::Registered,
            }
        ));
        assert_eq!(session.phase(), Phase::Registered);
        assert_eq!(h.ledger.transaction_count(TransactionKind::Register), 1);
    }

    #[tokio::test]
    async fn test_certified_session_is_spent() {
        let h = DevnetHarness::funded();
        let never = CancellationSignal::never();
        let mut session = h.publisher.encode(source(b"spent", "a.bin")).await.unwrap();
        let digest = h
            .publisher
            .register(&mut session, 1, &h.owner)
            .await
            .unwrap();
        h.publisher
            .upload(&mut session, Some(&digest), &never)
            .await
            .unwrap();
        h.publisher.certify(&mut session).await.unwrap();

        assert_eq!(session.phase(), Phase::Certified);
        assert!(session.encoded_handle().is_none());
        assert!(session.registration_digest().is_none());

        let err = h
            .publisher
            .upload(&mut session, None, &never)
            .await
            .unwrap_err();
        assert!(matches!(err, PublisherError::InvalidPhaseTransition { .. }));
        assert_eq!(session.phase(), Phase::Certified);
        assert_eq!(h.storage.upload_calls(), 1);
    }

    #[tokio::test]
    async fn test_digest_mismatch_skips_backend() {
        let h = DevnetHarness::funded();
        let mut session = h.publisher.encode(source(b"mismatch", "a.bin")).await.unwrap();
        h.publisher
            .register(&mut session, 1, &h.owner)
            .await
            .unwrap();

        let err = h
            .publisher
            .upload(
                &mut session,
                Some(&TxDigest::new("someone-elses-digest")),
                &CancellationSignal::never(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PublisherError::DigestMismatch { .. }));
        assert_eq!(h.storage.upload_calls(), 0);
        assert_eq!(session.phase(), Phase::Registered);
    }

    // =========================================================================
    // FUNDING AND INPUT CHECKS
    // =========================================================================

    #[tokio::test]
    async fn test_low_balance_blocks_register() {
        let h = DevnetHarness::new(Amount::from_base_units(50_000_000), 0);
        let mut session = h.publisher.encode(source(b"poor", "a.bin")).await.unwrap();

        let err = h
            .publisher
            .register(&mut session, 1, &h.owner)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublisherError::InsufficientFunds {
                phase: Phase::Registering,
                ..
            }
        ));
        assert_eq!(session.phase(), Phase::Encoded);
        assert_eq!(h.ledger.transaction_count(TransactionKind::Register), 0);
    }

    #[tokio::test]
    async fn test_empty_file_never_reaches_storage() {
        let h = DevnetHarness::funded();
        let failure = h
            .publisher
            .encode(SourceObject::new(Vec::new(), "empty.bin", MediaType::octet_stream()))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, PublisherError::EmptyInput));
        assert!(failure.session.is_none());
        assert_eq!(h.storage.encode_calls(), 0);
    }

    // =========================================================================
    // RETRY AND CANCELLATION
    // =========================================================================

    #[tokio::test]
    async fn test_upload_failure_then_direct_retry() {
        let h = DevnetHarness::new(Amount::from_coins(1), 1);
        let driver = OneClickDriver::new(Arc::clone(&h.publisher));
        let request = FlowRequest::new(source(b"retry me", "clip.mp4"), 3, h.owner.clone());

        let failure = driver.run(request).await.unwrap_err();
        assert!(matches!(failure.error, PublisherError::UploadError { .. }));
        assert_eq!(
            h.reporter.last_status().as_deref(),
            Some("One-click flow failed during upload: Upload failed: network error: storage node 3 timed out")
        );

        let mut session = failure.session.unwrap();
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.checkpoint(), Phase::Registered);

        h.publisher
            .upload(&mut session, None, &CancellationSignal::never())
            .await
            .unwrap();
        let outcome = h.publisher.certify(&mut session).await.unwrap();

        assert!(outcome.primary_content_id().is_some());
        assert_eq!(h.ledger.transaction_count(TransactionKind::Register), 1);
        assert_eq!(h.storage.encode_calls(), 1);
        assert_eq!(h.storage.upload_calls(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_upload_resumes_from_registered() {
        let h = DevnetHarness::funded();
        let mut session = h.publisher.encode(source(b"cancel", "a.bin")).await.unwrap();
        h.publisher
            .register(&mut session, 1, &h.owner)
            .await
            .unwrap();

        let (handle, signal) = cancellation_pair();
        handle.cancel();
        let err = h
            .publisher
            .upload(&mut session, None, &signal)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublisherError::UploadError { ref cause } if cause == "upload cancelled"
        ));
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.checkpoint(), Phase::Registered);

        // Only the failed operation may be retried.
        let err = h.publisher.certify(&mut session).await.unwrap_err();
        assert!(matches!(err, PublisherError::InvalidPhaseTransition { .. }));

        h.publisher
            .upload(&mut session, None, &CancellationSignal::never())
            .await
            .unwrap();
        h.publisher.certify(&mut session).await.unwrap();
        assert_eq!(session.phase(), Phase::Certified);
        assert_eq!(h.ledger.transaction_count(TransactionKind::Register), 1);
    }

    #[tokio::test]
    async fn test_concurrent_full_flow_refused() {
        let gate = Arc::new(Notify::new());
        let storage = Arc::new(MockStorageBackend::new().with_encode_gate(gate.clone()));
        let ledger = Arc::new(MockLedger::with_balance(Amount::from_coins(1)));
        let reporter = Arc::new(RecordingReporter::default());
        let service = Arc::new(PublicationService::new(
            PublisherConfig::for_testing(),
            storage,
            ledger,
            reporter.clone(),
        ));
        let driver = Arc::new(OneClickDriver::new(service));
        let owner = strata_publisher::AccountAddress::new("0xowner");

        let first = {
            let driver = Arc::clone(&driver);
            let request = FlowRequest::new(source(b"first", "first.bin"), 1, owner.clone());
            tokio::spawn(async move { driver.run(request).await })
        };
        while !driver.is_running() {
            tokio::task::yield_now().await;
        }

        let second = driver
            .run(FlowRequest::new(source(b"second", "second.bin"), 1, owner))
            .await
            .unwrap_err();
        assert!(matches!(second.error, PublisherError::AlreadyRunning));
        assert!(second.session.is_none());
        // The refusal leaves the running flow's status line alone.
        assert_eq!(reporter.last_status().as_deref(), Some("Encoding..."));

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.primary_content_id().unwrap().as_str(), "mock-blob");
        assert_eq!(reporter.phases(), FORWARD_PATH.to_vec());
        assert!(!driver.is_running());
    }
}
