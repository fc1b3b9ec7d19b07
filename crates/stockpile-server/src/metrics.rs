//! Prometheus metrics for the Stockpile server.
//!
//! This module provides:
//! - HTTP request metrics (count, latency)
//! - Cache metrics (hits and misses per resource, failed cache operations)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Cache metrics
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_ERRORS_TOTAL: &str = "cache_errors_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders from the handle.
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

// =============================================================================
// HTTP Metrics
// =============================================================================

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => normalized_path
    )
    .record(duration.as_secs_f64());
}

// =============================================================================
// Cache Metrics
// =============================================================================

/// Record a cache hit for a resource kind.
pub fn record_cache_hit(resource: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "resource" => resource).increment(1);
}

/// Record a cache miss for a resource kind.
pub fn record_cache_miss(resource: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "resource" => resource).increment(1);
}

/// Record a cache operation that failed and was swallowed.
pub fn record_cache_error(op: &'static str) {
    counter!(names::CACHE_ERRORS_TOTAL, "op" => op).increment(1);
}

// =============================================================================
// Helpers
// =============================================================================

/// Collections whose second path segment is a record id.
const ID_COLLECTIONS: &[&str] = &["products", "tasks"];

/// Replaces record ids with `{id}` to keep label cardinality bounded.
pub fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();
    let mut normalized = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        let is_id = i == 2 && !part.is_empty() && ID_COLLECTIONS.contains(&parts[1]);
        if is_id {
            normalized.push("{id}");
        } else {
            normalized.push(part);
        }
    }

    normalized.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/products/12345"), "/products/{id}");
        assert_eq!(
            normalize_path("/tasks/550e8400-e29b-41d4-a716-446655440000"),
            "/tasks/{id}"
        );
        assert_eq!(normalize_path("/products"), "/products");
        assert_eq!(normalize_path("/products/"), "/products/");
        assert_eq!(normalize_path("/cache/stats"), "/cache/stats");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn render_is_none_before_init() {
        // Recording without a recorder is a no-op.
        record_cache_hit("product");
        record_cache_error("get");
        if PROMETHEUS_HANDLE.get().is_none() {
            assert!(render_metrics().is_none());
        }
    }
}
