//! Export metrics
//!
//! Counters and histograms for batch outcomes, request latency and exported
//! records, recorded through the `metrics` facade. Nothing is collected unless
//! a recorder is installed; [`init_metrics`] installs the Prometheus exporter
//! with its own scrape endpoint.

use crate::downloader::BatchOutcome;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, info};

static METRICS_INITIALIZED: OnceCell<SocketAddr> = OnceCell::new();

/// Install the Prometheus exporter listening on `addr`
///
/// Idempotent: later calls are ignored once an exporter is installed.
///
/// # Errors
/// Returns an error if the exporter cannot be installed (address in use,
/// another recorder already set)
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(existing) = METRICS_INITIALIZED.get() {
        debug!(%existing, "Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics exporter on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "batches_total",
        Unit::Count,
        "Batches executed, labelled by outcome"
    );
    describe_counter!(
        "batches_truncated_total",
        Unit::Count,
        "Batches whose record count reached the per-query cap"
    );
    describe_counter!(
        "records_received_total",
        Unit::Count,
        "Event records received across all batches"
    );
    describe_histogram!(
        "batch_request_duration_seconds",
        Unit::Seconds,
        "Time from request start to classified outcome"
    );
    describe_counter!(
        "records_exported_total",
        Unit::Count,
        "Event records written to the output file"
    );

    let _ = METRICS_INITIALIZED.set(addr);
    Ok(())
}

/// Whether the exporter has been installed
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.get().is_some()
}

/// Timing and outcome recording for one batch
pub struct BatchMetrics {
    label: String,
    start_time: Instant,
}

impl BatchMetrics {
    /// Start timing a batch
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start_time: Instant::now(),
        }
    }

    /// Record the classified outcome
    pub fn record(&self, outcome: &BatchOutcome) {
        let duration = self.start_time.elapsed();
        let kind = outcome.kind();

        counter!("batches_total", "outcome" => kind.as_str()).increment(1);
        histogram!("batch_request_duration_seconds", "outcome" => kind.as_str())
            .record(duration.as_secs_f64());
        counter!("records_received_total").increment(outcome.record_count() as u64);

        if outcome.is_truncated() {
            counter!("batches_truncated_total").increment(1);
        }

        debug!(
            batch = %self.label,
            outcome = %kind,
            duration_ms = duration.as_millis(),
            "Batch metrics recorded"
        );
    }
}

/// Record the number of records written to the output artifact
pub fn record_export(records: usize) {
    counter!("records_exported_total").increment(records as u64);
}
