//! Video, producer and category handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use videocat_core::{Category, Pagination, Producer, SearchPage, Video};

use super::error::ApiError;
use super::middleware::Caller;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Raw paging parameters. Kept as strings so malformed values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<Video>,
}

#[derive(Debug, Serialize)]
pub struct CategoryVideosResponse {
    pub videos: Vec<Video>,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct ProducerVideosResponse {
    pub videos: Vec<Video>,
    pub producer: String,
}

#[derive(Debug, Serialize)]
pub struct ProducerListResponse {
    pub producers: Vec<Producer>,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub video: Video,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/videos
///
/// Random sample of videos.
pub async fn random_videos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<VideoListResponse>, ApiError> {
    let engine = state.engine();
    let limit = engine.limits().parse_limit(params.limit.as_deref());
    let videos = engine.random_sample(limit).await?;
    Ok(Json(VideoListResponse { videos }))
}

/// GET /api/v1/videos/search?q=
pub async fn search_videos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>, ApiError> {
    let engine = state.engine();
    let page = Pagination::from_query(
        params.limit.as_deref(),
        params.offset.as_deref(),
        engine.limits(),
    );
    Ok(Json(engine.search(&params.q, page).await?))
}

/// GET /api/v1/videos/category/{slug}
pub async fn videos_by_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<CategoryVideosResponse>, ApiError> {
    let engine = state.engine();
    let limit = engine.limits().parse_limit(params.limit.as_deref());
    let videos = engine.by_category_slug(&slug, limit).await?;
    Ok(Json(CategoryVideosResponse {
        videos,
        category: slug,
    }))
}

/// GET /api/v1/videos/producer/{slug}
pub async fn videos_by_producer(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProducerVideosResponse>, ApiError> {
    let engine = state.engine();
    let limit = engine.limits().parse_limit(params.limit.as_deref());
    let videos = engine.by_producer_slug(&slug, limit).await?;
    Ok(Json(ProducerVideosResponse {
        videos,
        producer: slug,
    }))
}

/// GET /api/v1/videos/{id}
///
/// Counts as a view.
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Video>, ApiError> {
    Ok(Json(state.engine().get_by_id(&id).await?))
}

/// GET /api/v1/producers
pub async fn list_producers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProducerListResponse>, ApiError> {
    let producers = state.engine().list_producers().await?;
    Ok(Json(ProducerListResponse { producers }))
}

/// GET /api/v1/categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let categories = state.engine().list_categories().await?;
    Ok(Json(CategoryListResponse { categories }))
}

/// POST /api/v1/internal/videos/upsert
///
/// Create or fully replace a video. Requires authentication.
pub async fn upsert_video(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    payload: Result<Json<Video>, JsonRejection>,
) -> Result<Json<UpsertResponse>, ApiError> {
    let Json(video) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let video = state.engine().upsert(video).await?;
    tracing::info!(video_id = %video.id, caller = %caller, "Upsert accepted");

    Ok(Json(UpsertResponse {
        video,
        message: "Video upserted successfully".to_string(),
    }))
}
