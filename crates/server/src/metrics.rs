//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the catalog server:
//! - HTTP request metrics (latency, counts)
//! - Catalog size (collected dynamically)
//! - Maintenance passes

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediacat_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediacat_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics
// =============================================================================

/// Entries held by the identity cache (collected dynamically).
pub static CACHED_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediacat_cached_entries",
        "Number of entries held by the identity cache",
    )
    .unwrap()
});

/// Persisted objects (collected dynamically).
pub static PERSISTED_OBJECTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mediacat_persisted_objects", "Number of persisted objects").unwrap()
});

/// Maintenance passes by outcome.
pub static MAINTENANCE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediacat_maintenance_runs_total", "Catalog maintenance passes"),
        &["outcome"], // "success", "failure"
    )
    .unwrap()
});

/// Program guide events removed by maintenance.
pub static EPG_ITEMS_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediacat_epg_items_swept_total",
        "Expired program guide events removed",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    // HTTP metrics
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();

    // Catalog metrics
    registry.register(Box::new(CACHED_ENTRIES.clone())).unwrap();
    registry
        .register(Box::new(PERSISTED_OBJECTS.clone()))
        .unwrap();
    registry
        .register(Box::new(MAINTENANCE_RUNS.clone()))
        .unwrap();
    registry.register(Box::new(EPG_ITEMS_SWEPT.clone())).unwrap();

    // Core metrics (identity cache, storage, browse)
    for metric in mediacat_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Update gauges from the current catalog state.
///
/// Called before encoding so scrapes see fresh values.
pub fn collect_dynamic_metrics(state: &AppState) {
    if let Ok(stats) = state.catalog().stats() {
        CACHED_ENTRIES.set(stats.cached_entries as i64);
        PERSISTED_OBJECTS.set(stats.total_objects);
    }
}
