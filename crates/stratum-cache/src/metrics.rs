//! Cache metrics.
//!
//! Recorded through the `metrics` facade so recording is a no-op until a
//! recorder is installed and can never fail or block the caching path.
//! `init_metrics()` installs a Prometheus recorder once at startup;
//! `render_metrics()` renders the text exposition for an embedding server's
//! `/metrics` endpoint.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_PUTS_TOTAL: &str = "cache_puts_total";
    pub const CACHE_EVICTIONS_TOTAL: &str = "cache_evictions_total";
    pub const CACHE_STORE_ERRORS_TOTAL: &str = "cache_store_errors_total";
    pub const CACHE_STORE_DURATION_SECONDS: &str = "cache_store_duration_seconds";
}

/// Install the Prometheus recorder.
///
/// Returns `true` on first successful installation, `false` if already
/// initialized (or if another recorder is installed globally).
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// Record a hit on the in-process tier.
pub fn record_l1_hit(cache: &str) {
    counter!(names::CACHE_HITS_TOTAL, "cache" => cache.to_string(), "level" => "l1").increment(1);
}

/// Record a hit on the shared tier.
pub fn record_l2_hit(cache: &str) {
    counter!(names::CACHE_HITS_TOTAL, "cache" => cache.to_string(), "level" => "l2").increment(1);
}

/// Record a miss on both tiers.
pub fn record_miss(cache: &str) {
    counter!(names::CACHE_MISSES_TOTAL, "cache" => cache.to_string()).increment(1);
}

pub fn record_put(cache: &str) {
    counter!(names::CACHE_PUTS_TOTAL, "cache" => cache.to_string()).increment(1);
}

pub fn record_evictions(cache: &str, count: u64) {
    counter!(names::CACHE_EVICTIONS_TOTAL, "cache" => cache.to_string()).increment(count);
}

/// Record a failed distributed-store or channel operation.
pub fn record_store_error(cache: &str, operation: &str) {
    counter!(
        names::CACHE_STORE_ERRORS_TOTAL,
        "cache" => cache.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record the latency of a distributed-store operation, successful or not.
pub fn record_store_duration(cache: &str, operation: &str, duration: Duration) {
    histogram!(
        names::CACHE_STORE_DURATION_SECONDS,
        "cache" => cache.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}
