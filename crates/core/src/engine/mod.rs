//! Query engine.
//!
//! Every video-returning operation resolves relationships before returning.
//! Single-video reads record a view without waiting for it.

mod pagination;
mod resolver;
mod upsert;

pub use pagination::{PageLimits, Pagination};
pub use resolver::RelationshipResolver;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::catalog::{
    CatalogResult, CatalogStore, Category, Producer, Video, VideoFilter, VideoQuery,
};
use crate::metrics::{QUERY_DURATION, UPSERTS_TOTAL};
use crate::views::ViewCounter;

/// A page of search results with the effective parameters echoed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub videos: Vec<Video>,
    pub query: String,
    pub limit: u32,
    pub offset: u32,
}

/// Read and write operations over a [`CatalogStore`].
#[derive(Clone)]
pub struct CatalogEngine {
    store: Arc<dyn CatalogStore>,
    resolver: RelationshipResolver,
    views: ViewCounter,
    limits: PageLimits,
}

impl CatalogEngine {
    pub fn new(store: Arc<dyn CatalogStore>, views: ViewCounter, limits: PageLimits) -> Self {
        Self {
            resolver: RelationshipResolver::new(Arc::clone(&store)),
            store,
            views,
            limits,
        }
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// The view counter reads are recorded on.
    pub fn views(&self) -> &ViewCounter {
        &self.views
    }

    /// Fetch one video and record a view.
    ///
    /// The returned `views` is the count before this read. Nothing is recorded
    /// unless the video is returned.
    pub async fn get_by_id(&self, id: &str) -> CatalogResult<Video> {
        let _timer = QUERY_DURATION.with_label_values(&["get_by_id"]).start_timer();

        let video = self.store.get_video(id).await?;
        let video = self.resolver.resolve_one(video).await?;
        self.views.record(&video.id);
        Ok(video)
    }

    /// Case-insensitive substring search over title and description.
    ///
    /// Blank text returns the unfiltered listing.
    pub async fn search(&self, text: &str, page: Pagination) -> CatalogResult<SearchPage> {
        let _timer = QUERY_DURATION.with_label_values(&["search"]).start_timer();

        let limit = self.limits.clamp(page.limit);
        let filter = if text.trim().is_empty() {
            VideoFilter::All
        } else {
            VideoFilter::Text(text.to_string())
        };
        let videos = self
            .find(VideoQuery::new(filter).with_limit(limit).with_offset(page.offset))
            .await?;

        Ok(SearchPage {
            videos,
            query: text.to_string(),
            limit,
            offset: page.offset,
        })
    }

    /// Videos in the category with exactly this slug. Unknown slugs yield an
    /// empty list.
    pub async fn by_category_slug(&self, slug: &str, limit: u32) -> CatalogResult<Vec<Video>> {
        let _timer = QUERY_DURATION.with_label_values(&["by_category"]).start_timer();

        let query = VideoQuery::new(VideoFilter::CategorySlug(slug.to_string()))
            .with_limit(self.limits.clamp(limit));
        self.find(query).await
    }

    /// Videos by the producer with exactly this slug. Unknown slugs yield an
    /// empty list.
    pub async fn by_producer_slug(&self, slug: &str, limit: u32) -> CatalogResult<Vec<Video>> {
        let _timer = QUERY_DURATION.with_label_values(&["by_producer"]).start_timer();

        let query = VideoQuery::new(VideoFilter::ProducerSlug(slug.to_string()))
            .with_limit(self.limits.clamp(limit));
        self.find(query).await
    }

    /// Up to `limit` videos in random order.
    pub async fn random_sample(&self, limit: u32) -> CatalogResult<Vec<Video>> {
        let _timer = QUERY_DURATION.with_label_values(&["random"]).start_timer();

        let videos = self.store.sample_videos(self.limits.clamp(limit)).await?;
        self.resolver.resolve(videos).await
    }

    /// Newest-first listing of every video.
    pub async fn list_videos(&self, page: Pagination) -> CatalogResult<Vec<Video>> {
        let _timer = QUERY_DURATION.with_label_values(&["list_videos"]).start_timer();

        let query = VideoQuery::new(VideoFilter::All)
            .with_limit(self.limits.clamp(page.limit))
            .with_offset(page.offset);
        self.find(query).await
    }

    pub async fn list_producers(&self) -> CatalogResult<Vec<Producer>> {
        let _timer = QUERY_DURATION.with_label_values(&["list_producers"]).start_timer();
        self.store.list_producers().await
    }

    pub async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        let _timer = QUERY_DURATION.with_label_values(&["list_categories"]).start_timer();
        self.store.list_categories().await
    }

    /// Create or fully replace a video. See `upsert::prepare` for the rules
    /// applied to the payload.
    pub async fn upsert(&self, video: Video) -> CatalogResult<Video> {
        let _timer = QUERY_DURATION.with_label_values(&["upsert"]).start_timer();

        let prepared = match upsert::prepare(video, Utc::now()) {
            Ok(prepared) => prepared,
            Err(e) => {
                UPSERTS_TOTAL.with_label_values(&["invalid"]).inc();
                return Err(e);
            }
        };

        let stored = match self.store.replace_video(&prepared).await {
            Ok(stored) => stored,
            Err(e) => {
                UPSERTS_TOTAL.with_label_values(&["failed"]).inc();
                tracing::warn!(video_id = %prepared.id, error = %e, "Upsert failed");
                return Err(e);
            }
        };

        // created_at survives only when the row already existed.
        let outcome = if stored.created_at == prepared.created_at {
            "created"
        } else {
            "replaced"
        };
        UPSERTS_TOTAL.with_label_values(&[outcome]).inc();
        tracing::info!(video_id = %stored.id, outcome, "Video upserted");

        self.resolver.resolve_one(stored).await
    }

    async fn find(&self, query: VideoQuery) -> CatalogResult<Vec<Video>> {
        let videos = self.store.find_videos(&query).await?;
        self.resolver.resolve(videos).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::testing::{fixtures, MockCatalogStore};
    use crate::views::create_view_accounting;

    struct Harness {
        store: Arc<MockCatalogStore>,
        engine: CatalogEngine,
        writer: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        async fn shutdown(self) {
            drop(self.engine);
            self.writer.await.unwrap();
        }
    }

    fn harness() -> Harness {
        let store = Arc::new(MockCatalogStore::new());
        store.add_producer(fixtures::producer("p1", "nudex-studios"));
        store.add_category(fixtures::category("c1", "action"));
        store.add_category(fixtures::category("c2", "comedy"));

        for i in 0..6 {
            let mut video = fixtures::video(&format!("v{}", i), &format!("Clip {}", i));
            video.created_at = fixtures::timestamp(i);
            video.producer_id = Some("p1".to_string());
            video.category_id = Some(if i % 2 == 0 { "c1" } else { "c2" }.to_string());
            store.add_video(video);
        }

        let (views, writer) = create_view_accounting(store.clone());
        let writer = tokio::spawn(writer.run());
        let engine = CatalogEngine::new(store.clone(), views, PageLimits::default());
        Harness {
            store,
            engine,
            writer,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_resolves_and_counts_view() {
        let h = harness();

        let video = h.engine.get_by_id("v1").await.unwrap();
        assert_eq!(video.views, 0);
        assert_eq!(video.producer.as_ref().unwrap().slug, "nudex-studios");
        assert_eq!(video.category.as_ref().unwrap().slug, "comedy");

        h.engine.views().flush().await.unwrap();
        assert_eq!(h.store.views("v1"), Some(1));

        let again = h.engine.get_by_id("v1").await.unwrap();
        assert!(again.views >= video.views);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_records_nothing() {
        let h = harness();
        let result = h.engine.get_by_id("missing").await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));

        h.engine.views().flush().await.unwrap();
        assert_eq!(h.store.increment_calls(), 0);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_by_id_failed_resolution_records_nothing() {
        let h = harness();
        h.store.set_fail_relations(true);

        let result = h.engine.get_by_id("v1").await;
        assert!(matches!(result, Err(CatalogError::Store(_))));

        h.engine.views().flush().await.unwrap();
        assert_eq!(h.store.increment_calls(), 0);
        assert_eq!(h.store.views("v1"), Some(0));

        h.store.set_fail_relations(false);
        h.engine.get_by_id("v1").await.unwrap();
        h.engine.views().flush().await.unwrap();
        assert_eq!(h.store.views("v1"), Some(1));
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let h = harness();
        let mut video = fixtures::video("eco", "Économie Spéciale");
        video.created_at = fixtures::timestamp(100);
        h.store.add_video(video);

        let page = h.engine.search("économie", Pagination::new(10, 0)).await.unwrap();
        assert_eq!(page.videos.len(), 1);
        assert_eq!(page.videos[0].id, "eco");

        let page = h.engine.search("ÉCONOMIE", Pagination::new(10, 0)).await.unwrap();
        assert_eq!(page.videos.len(), 1);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_blank_search_matches_listing() {
        let h = harness();
        let page = Pagination::new(3, 1);

        let searched = h.engine.search("  ", page).await.unwrap();
        let listed = h.engine.list_videos(page).await.unwrap();
        assert_eq!(searched.videos, listed);
        assert_eq!(searched.query, "  ");
        assert_eq!((searched.limit, searched.offset), (3, 1));
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_search_echoes_clamped_limit() {
        let h = harness();
        let page = h.engine.search("clip", Pagination::new(500, 0)).await.unwrap();
        assert_eq!(page.limit, 100);
        assert_eq!(page.videos.len(), 6);
        assert!(page.videos.iter().all(|v| v.producer.is_some()));
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_slug_filters() {
        let h = harness();

        let action = h.engine.by_category_slug("action", 10).await.unwrap();
        assert_eq!(action.len(), 3);
        assert!(action.iter().all(|v| v.category.as_ref().unwrap().slug == "action"));

        assert!(h.engine.by_category_slug("horror", 10).await.unwrap().is_empty());

        let produced = h.engine.by_producer_slug("nudex-studios", 4).await.unwrap();
        assert_eq!(produced.len(), 4);
        assert!(h.engine.by_producer_slug("nobody", 4).await.unwrap().is_empty());
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_random_sample_size() {
        let h = harness();
        assert_eq!(h.engine.random_sample(4).await.unwrap().len(), 4);
        assert_eq!(h.engine.random_sample(50).await.unwrap().len(), 6);
        assert!(h.engine.random_sample(0).await.unwrap().is_empty());
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_upsert_create_then_replace() {
        let h = harness();

        let created = h
            .engine
            .upsert(Video {
                title: "Fresh Upload".to_string(),
                description: "First cut".to_string(),
                url: "https://example.com/fresh.mp4".to_string(),
                category_id: Some("c1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.category.as_ref().unwrap().slug, "action");

        let replaced = h
            .engine
            .upsert(Video {
                id: created.id.clone(),
                title: "Fresh Upload (final)".to_string(),
                url: "https://example.com/fresh-final.mp4".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(replaced.id, created.id);
        assert!(replaced.description.is_empty());
        assert!(replaced.category_id.is_none());
        assert_eq!(replaced.created_at, created.created_at);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_upsert_validation_leaves_store_untouched() {
        let h = harness();
        let before = h.store.video("v0");

        let result = h
            .engine
            .upsert(Video {
                id: "v0".to_string(),
                title: String::new(),
                url: "https://example.com/x.mp4".to_string(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(CatalogError::Validation { field: "title", .. })));
        assert_eq!(h.store.video("v0"), before);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_upsert_store_failure() {
        let h = harness();
        h.store.set_fail_writes(true);
        let result = h
            .engine
            .upsert(fixtures::video("new", "Doomed"))
            .await;
        assert!(matches!(result, Err(CatalogError::Store(_))));
        h.shutdown().await;
    }
}
