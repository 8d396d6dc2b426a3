//! Prometheus metrics for Strata.
//!
//! All metrics follow the naming convention: `strata_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., bytes published)
//! - **Histogram**: Distribution of values (e.g., upload duration)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PUBLICATION METRICS
    // =========================================================================

    /// Phase outcomes
    pub static ref PHASE_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("strata_publish_phase_outcomes_total", "Publication phase outcomes"),
        &["phase", "outcome"]  // outcome: success/failure/rejected
    ).expect("metric creation failed");

    /// Bytes of certified objects
    pub static ref BYTES_PUBLISHED: Counter = Counter::new(
        "strata_publish_bytes_total",
        "Total bytes of objects that reached certification"
    ).expect("metric creation failed");

    /// Shard upload duration
    pub static ref UPLOAD_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "strata_publish_upload_duration_seconds",
            "Time spent streaming shards to storage nodes"
        ).buckets(exponential_buckets(0.01, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Full flows refused because another was running
    pub static ref FLOWS_REJECTED: Counter = Counter::new(
        "strata_publish_flows_rejected_total",
        "Full flows refused while another flow was running"
    ).expect("metric creation failed");

    // =========================================================================
    // RETRIEVAL METRICS
    // =========================================================================

    /// Retrievals by path
    pub static ref RETRIEVALS: CounterVec = CounterVec::new(
        Opts::new("strata_retrievals_total", "Retrievals by path"),
        &["source"]  // source: structured/raw_blob/failed
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; already registered collectors are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(PHASE_OUTCOMES.clone()),
        Box::new(BYTES_PUBLISHED.clone()),
        Box::new(UPLOAD_DURATION.clone()),
        Box::new(FLOWS_REJECTED.clone()),
        Box::new(RETRIEVALS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Record one phase outcome.
pub fn record_phase_outcome(phase: &str, outcome: &str) {
    PHASE_OUTCOMES.with_label_values(&[phase, outcome]).inc();
}

/// Record one retrieval.
pub fn record_retrieval(source: &str) {
    RETRIEVALS.with_label_values(&[source]).inc();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Record a completed upload.
pub fn observe_upload(duration: std::time::Duration) {
    UPLOAD_DURATION.observe(duration.as_secs_f64());
}
