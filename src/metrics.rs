//! Observability metrics for the telemetry pipeline
//!
//! Counters and histograms are always recorded through the `metrics` facade;
//! they only leave the process when [`init_metrics`] has installed the
//! Prometheus exporter (`--metrics-addr`). Without it the calls are no-ops.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install the Prometheus exporter and describe every metric
///
/// Idempotent: later calls are ignored.
///
/// # Errors
/// Fails if the exporter cannot bind `addr`
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "telemetry_requests_total",
        Unit::Count,
        "HTTP requests sent to the telemetry API"
    );
    describe_histogram!(
        "telemetry_request_duration_seconds",
        Unit::Seconds,
        "Telemetry API request duration"
    );
    describe_counter!(
        "telemetry_outcomes_total",
        Unit::Count,
        "Per-endpoint fetch outcomes by status"
    );
    describe_counter!(
        "telemetry_dropped_total",
        Unit::Count,
        "Endpoints that produced no outcome (non-2xx status)"
    );
    describe_counter!(
        "telemetry_cooldowns_total",
        Unit::Count,
        "Dispatch cooldown pauses"
    );
    describe_counter!(
        "telemetry_directory_failures_total",
        Unit::Count,
        "Directory calls that degraded to an empty device list"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Next correlation id for request tracing
pub fn generate_correlation_id() -> String {
    let n = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{n:08x}")
}

/// Timing and outcome of one HTTP request
pub struct HttpRequestMetrics {
    kind: &'static str,
    start_time: Instant,
    correlation_id: String,
}

impl HttpRequestMetrics {
    /// Start timing a request of the given kind (`directory` or `samples`)
    pub fn start(kind: &'static str) -> Self {
        let correlation_id = generate_correlation_id();
        debug!(correlation_id = %correlation_id, kind, "Starting HTTP request");

        Self {
            kind,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    /// Record a response with a status code
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "telemetry_requests_total",
            "kind" => self.kind,
            "status" => status_code.to_string(),
        )
        .increment(1);
        histogram!("telemetry_request_duration_seconds", "kind" => self.kind)
            .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            kind = self.kind,
            status = status_code,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    /// Record a request that never got a status code
    pub fn record_network_error(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "telemetry_requests_total",
            "kind" => self.kind,
            "status" => "network_error",
        )
        .increment(1);
        histogram!("telemetry_request_duration_seconds", "kind" => self.kind)
            .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            kind = self.kind,
            duration_ms = duration.as_millis(),
            error,
            "Network error recorded"
        );
    }

    /// Correlation id of this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Count one endpoint outcome (`success` or `failure`)
pub fn record_outcome(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("telemetry_outcomes_total", "status" => status).increment(1);
}

/// Count endpoints that were dispatched but produced no outcome
pub fn record_dropped(count: u64) {
    if count > 0 {
        counter!("telemetry_dropped_total").increment(count);
    }
}

/// Count a dispatch cooldown
pub fn record_cooldown(duration: Duration) {
    counter!("telemetry_cooldowns_total").increment(1);
    debug!(cooldown_ms = duration.as_millis(), "Cooldown recorded");
}

/// Count a directory call that degraded to an empty list
pub fn record_directory_failure() {
    counter!("telemetry_directory_failures_total").increment(1);
}

/// Whether the exporter is installed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
