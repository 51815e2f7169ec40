//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the catalog server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Authentication failures on the internal routes
//! - Catalog size (collected dynamically)
//!
//! Query engine and view accounting metrics live in `videocat_core::metrics`
//! and are registered here as well.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

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
            "videocat_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("videocat_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "videocat_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "videocat_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Videos in the catalog.
pub static VIDEOS_TOTAL: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("videocat_videos", "Number of videos in the catalog").unwrap());

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Catalog
    registry.register(Box::new(VIDEOS_TOTAL.clone())).unwrap();

    // Core metrics (query engine, view accounting, upserts)
    for metric in videocat_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the store as of the scrape.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.engine().store().count_videos().await {
        Ok(count) => VIDEOS_TOTAL.set(count as i64),
        Err(e) => tracing::debug!(error = %e, "Skipping video count gauge"),
    }
}

/// Normalize a path for metric labels (replace IDs and slugs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let mut segments = Vec::new();
    let mut prev = "";
    for segment in path.split('/') {
        let label = match (prev, segment) {
            (_, "") => segment,
            ("category" | "producer", _) => "{slug}",
            ("videos", "search" | "category" | "producer" | "upsert") => segment,
            ("videos", _) => "{id}",
            (_, s) if is_uuid(s) || s.bytes().all(|b| b.is_ascii_digit()) => "{id}",
            _ => segment,
        };
        segments.push(label);
        prev = segment;
    }
    segments.join("/")
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && s.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}
