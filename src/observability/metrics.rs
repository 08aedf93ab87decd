//! Metrics collection and exposition.
//!
//! # Metrics
//! - `indicator_provider_attempts_total` (counter): attempts by provider, outcome
//! - `indicator_provider_fetch_seconds` (histogram): per-attempt latency
//! - `indicator_resolutions_total` (counter): terminal state per metric
//! - `indicator_cache_writes_total` (counter): last-known-good writes per metric
//! - `indicator_cache_entries` (gauge): cached metric keys

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_provider_attempt(provider: &str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "indicator_provider_attempts_total",
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("indicator_provider_fetch_seconds", "provider" => provider.to_string())
        .record(elapsed.as_secs_f64());
}

/// `state` is one of `resolved`, `cache_hit`, `failed`.
pub fn record_resolution(metric: &str, state: &'static str) {
    counter!(
        "indicator_resolutions_total",
        "metric" => metric.to_string(),
        "state" => state
    )
    .increment(1);
}

pub fn record_cache_write(metric: &str) {
    counter!("indicator_cache_writes_total", "metric" => metric.to_string()).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("indicator_cache_entries").set(size as f64);
}
