//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Query engine (per-operation latency)
//! - View accounting (applied and failed increments)
//! - Upserts (by result)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Query Engine
// =============================================================================

/// Query duration in seconds by engine operation.
pub static QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "videocat_query_duration_seconds",
            "Duration of catalog queries including relation resolution",
        )
        .buckets(vec![
            0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
        ]),
        // "get_by_id", "search", "by_category", "by_producer", "random",
        // "list_videos", "list_producers", "list_categories", "upsert"
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// View Accounting
// =============================================================================

/// Views applied to the store (sum of deltas).
pub static VIEW_INCREMENTS_APPLIED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "videocat_view_increments_applied_total",
        "Total views persisted by the view accounting writer",
    )
    .unwrap()
});

/// Views dropped because the increment failed.
pub static VIEW_INCREMENTS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "videocat_view_increments_failed_total",
        "Total views lost to failed increments",
    )
    .unwrap()
});

// =============================================================================
// Upserts
// =============================================================================

/// Upserts by result.
pub static UPSERTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("videocat_upserts_total", "Total video upserts"),
        &["result"], // "created", "replaced", "invalid", "failed"
    )
    .unwrap()
});

/// Returns all core metrics as boxed collectors for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(QUERY_DURATION.clone()),
        Box::new(VIEW_INCREMENTS_APPLIED.clone()),
        Box::new(VIEW_INCREMENTS_FAILED.clone()),
        Box::new(UPSERTS_TOTAL.clone()),
    ]
}
