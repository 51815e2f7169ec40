use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use videocat_core::SanitizedConfig;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    Connected,
    Disconnected,
    NotConfigured,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DependencyStatus,
    pub cache: DependencyStatus,
}

/// GET /api/v1/health
///
/// Always 200 while the process is serving; dependency state is reported in
/// the body.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.engine().store().health_check().await {
        Ok(()) => DependencyStatus::Connected,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            DependencyStatus::Disconnected
        }
    };

    let cache = match state.cache() {
        None => DependencyStatus::NotConfigured,
        Some(probe) => match probe.ping().await {
            Ok(()) => DependencyStatus::Connected,
            Err(e) => {
                tracing::warn!(error = %e, "Cache health check failed");
                DependencyStatus::Disconnected
            }
        },
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: VERSION.to_string(),
        database,
        cache,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
