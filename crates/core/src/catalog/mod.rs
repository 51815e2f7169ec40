//! Video catalog storage.
//!
//! Three tables (videos, producers, categories) with foreign keys from videos
//! to the other two. Relations are never embedded on write; see
//! [`crate::engine::RelationshipResolver`] for how they are attached on read.

mod pool;
pub mod schema;
mod sqlite;
mod types;

pub use pool::{build_pool, DatabaseTarget, SqliteManager, SqlitePool};
pub use sqlite::SqliteCatalogStore;
pub use types::*;

use async_trait::async_trait;

/// Trait for catalog storage backends.
///
/// Every write is atomic at the single-record level; `seed_catalog` is atomic
/// as a whole.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Get a video by id, without relations.
    async fn get_video(&self, id: &str) -> CatalogResult<Video>;

    /// Find videos matching the query, newest first.
    async fn find_videos(&self, query: &VideoQuery) -> CatalogResult<Vec<Video>>;

    /// Pick up to `limit` videos at random.
    ///
    /// Returns `min(limit, total)` videos. The cost per call is bounded by
    /// `limit`, not by catalog size, so the distribution is only approximately
    /// uniform.
    async fn sample_videos(&self, limit: u32) -> CatalogResult<Vec<Video>>;

    /// Count all videos.
    async fn count_videos(&self) -> CatalogResult<u64>;

    /// Create the video if absent, otherwise overwrite every column except
    /// `created_at`. Returns the stored record.
    async fn replace_video(&self, video: &Video) -> CatalogResult<Video>;

    /// Atomically add `delta` to a video's view counter.
    async fn increment_views(&self, id: &str, delta: u64) -> CatalogResult<()>;

    /// Batched producer lookup. Unknown ids are skipped.
    async fn producers_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Producer>>;

    /// Batched category lookup. Unknown ids are skipped.
    async fn categories_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Category>>;

    /// All producers, ordered by name.
    async fn list_producers(&self) -> CatalogResult<Vec<Producer>>;

    /// All categories, ordered by name.
    async fn list_categories(&self) -> CatalogResult<Vec<Category>>;

    async fn create_producer(&self, producer: &Producer) -> CatalogResult<()>;

    async fn create_category(&self, category: &Category) -> CatalogResult<()>;

    /// Insert a bootstrap catalog as one transaction, or nothing at all.
    ///
    /// Returns `None` without writing when any video exists. A producer or
    /// category whose slug is already taken keeps the stored row, and the
    /// batch's videos are re-pointed at it.
    async fn seed_catalog(
        &self,
        categories: &[Category],
        producers: &[Producer],
        videos: &[Video],
    ) -> CatalogResult<Option<SeedReport>>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> CatalogResult<()>;
}
