//! # Runtime Scenarios
//!
//! The `strata publish` command path: environment configuration, flag
//! overrides, devnet wiring and the metrics it leaves behind.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use strata_publisher::{
        AccountAddress, CancellationSignal, FlowRequest, Phase, PublicationApi, PublisherError,
    };
    use strata_runtime::{publish, DevnetStack, PublishArgs, RuntimeConfig, DEFAULT_OWNER};
    use strata_telemetry::{encode_metrics, register_metrics};

    use crate::integration::fixtures::source;

    fn env(vars: &[(&str, &str)]) -> RuntimeConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    fn publish_args(path: PathBuf) -> PublishArgs {
        PublishArgs {
            path,
            epochs: None,
            owner: DEFAULT_OWNER.to_string(),
            step_by_step: false,
            fetch_back: true,
            download_dir: None,
        }
    }

    #[tokio::test]
    async fn test_publish_fetch_back_and_metrics() {
        register_metrics().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poster.png");
        std::fs::write(&path, b"\x89PNG poster").unwrap();
        let downloads = dir.path().join("downloads");
        let config = env(&[
            ("STRATA_DOWNLOAD_DIR", downloads.to_str().unwrap()),
            ("STRATA_SHARDS", "2"),
        ]);

        let report = publish(&publish_args(path), config, CancellationSignal::never())
            .await
            .unwrap();

        let saved = report.saved.unwrap();
        assert_eq!(saved, downloads.join("poster.png"));
        assert_eq!(std::fs::read(saved).unwrap(), b"\x89PNG poster");

        let metrics = encode_metrics().unwrap();
        assert!(metrics.contains("strata_publish_phase_outcomes_total"));
        assert!(metrics.contains("strata_publish_bytes_total"));
        assert!(metrics.contains("strata_retrievals_total"));
    }

    #[tokio::test]
    async fn test_flags_override_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"frames").unwrap();
        let config = env(&[("STRATA_EPOCHS", "9"), ("STRATA_DOWNLOAD_DIR", "/nonexistent")]);

        let mut args = publish_args(path);
        args.epochs = Some(2);
        args.download_dir = Some(dir.path().join("out"));
        args.step_by_step = true;

        let report = publish(&args, config, CancellationSignal::never())
            .await
            .unwrap();
        assert!(report.saved.unwrap().starts_with(dir.path().join("out")));
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_publish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 64]).unwrap();
        let config = env(&[("STRATA_MAX_FILE_SIZE", "16")]);

        let err = publish(&publish_args(path), config, CancellationSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PublisherError>(),
            Some(PublisherError::InputTooLarge { size: 64, max: 16 })
        ));
    }

    #[tokio::test]
    async fn test_devnet_stack_status_stream() {
        let dir = tempfile::tempdir().unwrap();
        let config = env(&[("STRATA_DOWNLOAD_DIR", dir.path().to_str().unwrap())]);
        let stack = DevnetStack::new(&config, AccountAddress::new("0xwatcher"));
        let mut status = stack.status.subscribe_status();
        let progress = stack.status.subscribe_progress();

        let request = FlowRequest::new(
            source(b"watched", "watched.txt"),
            1,
            stack.owner.clone(),
        );
        let outcome = stack.publisher.run_full_flow(request).await.unwrap();
        let id = outcome.primary_content_id().unwrap();

        assert!(status.has_changed().unwrap());
        assert_eq!(*status.borrow_and_update(), format!("Published as {id}"));
        assert_eq!(progress.borrow().phase, Phase::Certified);
        assert_eq!(progress.borrow().percent, 100);
    }
}
