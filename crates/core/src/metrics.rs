//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Identity cache (hits, misses)
//! - Object lifecycle (created, deleted by class)
//! - Storage (statement failures, id allocator fallbacks)
//! - Browse (requests by outcome)

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Identity Cache
// =============================================================================

/// Identity cache lookups by result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediacat_cache_lookups_total",
            "Total identity cache lookups",
        ),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

// =============================================================================
// Object Lifecycle
// =============================================================================

/// Objects created by class tag.
pub static OBJECTS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediacat_objects_created_total", "Total objects created"),
        &["class"],
    )
    .unwrap()
});

/// Objects deleted by class tag (descendants removed by cascade not included).
pub static OBJECTS_DELETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediacat_objects_deleted_total", "Total objects deleted"),
        &["class"],
    )
    .unwrap()
});

// =============================================================================
// Storage
// =============================================================================

/// Failed statements by purpose.
pub static STORAGE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediacat_storage_errors_total",
            "Total failed storage statements",
        ),
        &["statement"],
    )
    .unwrap()
});

/// Identifiers handed out from the wall-clock fallback range.
pub static ID_ALLOCATOR_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediacat_id_allocator_fallbacks_total",
        "Total identifiers allocated from the wall-clock fallback range",
    )
    .unwrap()
});

// =============================================================================
// Browse
// =============================================================================

/// Browse requests by outcome.
pub static BROWSE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediacat_browse_requests_total", "Total browse requests"),
        &["outcome"], // "success", "no_such_object", "invalid_sort_criteria", "internal_error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Cache
        Box::new(CACHE_LOOKUPS.clone()),
        // Lifecycle
        Box::new(OBJECTS_CREATED.clone()),
        Box::new(OBJECTS_DELETED.clone()),
        // Storage
        Box::new(STORAGE_ERRORS.clone()),
        Box::new(ID_ALLOCATOR_FALLBACKS.clone()),
        // Browse
        Box::new(BROWSE_REQUESTS.clone()),
    ]
}
