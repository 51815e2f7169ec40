use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{handlers, videos};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Internal routes (authenticated writes)
    let internal_routes = Router::new()
        .route("/videos/upsert", post(videos::upsert_video))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Videos
        .route("/videos", get(videos::random_videos))
        .route("/videos/search", get(videos::search_videos))
        .route("/videos/category/{slug}", get(videos::videos_by_category))
        .route("/videos/producer/{slug}", get(videos::videos_by_producer))
        .route("/videos/{id}", get(videos::get_video))
        // Producers and categories
        .route("/producers", get(videos::list_producers))
        .route("/categories", get(videos::list_categories))
        .nest("/internal", internal_routes);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
