//! In-memory catalog store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::catalog::{
    CatalogError, CatalogResult, CatalogStore, Category, Producer, SeedReport, Video, VideoFilter,
    VideoQuery,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    videos: HashMap<String, Video>,
    producers: HashMap<String, Producer>,
    categories: HashMap<String, Category>,
}

/// Mock implementation of the CatalogStore trait.
///
/// Mirrors the SQLite store's observable behavior (ordering, case-insensitive
/// search, reference checks, `created_at` preservation) and adds:
/// - Counters for batched relation lookups and view increments
/// - Failure toggles per kind of operation
#[derive(Debug, Default)]
pub struct MockCatalogStore {
    tables: Mutex<Tables>,
    producer_lookups: AtomicUsize,
    category_lookups: AtomicUsize,
    increment_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_increments: AtomicBool,
    fail_relations: AtomicBool,
}

impl MockCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a video as-is.
    pub fn add_video(&self, video: Video) {
        self.tables
            .lock()
            .unwrap()
            .videos
            .insert(video.id.clone(), video);
    }

    pub fn add_producer(&self, producer: Producer) {
        self.tables
            .lock()
            .unwrap()
            .producers
            .insert(producer.id.clone(), producer);
    }

    pub fn add_category(&self, category: Category) {
        self.tables
            .lock()
            .unwrap()
            .categories
            .insert(category.id.clone(), category);
    }

    pub fn video(&self, id: &str) -> Option<Video> {
        self.tables.lock().unwrap().videos.get(id).cloned()
    }

    pub fn views(&self, id: &str) -> Option<u64> {
        self.video(id).map(|v| v.views)
    }

    /// Number of `producers_by_ids` calls so far.
    pub fn producer_lookups(&self) -> usize {
        self.producer_lookups.load(Ordering::SeqCst)
    }

    /// Number of `categories_by_ids` calls so far.
    pub fn category_lookups(&self) -> usize {
        self.category_lookups.load(Ordering::SeqCst)
    }

    /// Number of `increment_views` calls so far.
    pub fn increment_calls(&self) -> usize {
        self.increment_calls.load(Ordering::SeqCst)
    }

    /// Fail video reads, listings and health checks.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fail `replace_video`, entity creation and seeding.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }

    /// Fail the batched producer/category lookups.
    pub fn set_fail_relations(&self, fail: bool) {
        self.fail_relations.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> CatalogResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(CatalogError::Store(format!("Mock {} failure", what)));
        }
        Ok(())
    }
}

fn matches_filter(tables: &Tables, video: &Video, filter: &VideoFilter) -> bool {
    match filter {
        VideoFilter::All => true,
        VideoFilter::Text(text) => {
            let needle = text.to_lowercase();
            video.title.to_lowercase().contains(&needle)
                || video.description.to_lowercase().contains(&needle)
        }
        VideoFilter::CategorySlug(slug) => video
            .category_id
            .as_ref()
            .and_then(|id| tables.categories.get(id))
            .is_some_and(|c| &c.slug == slug),
        VideoFilter::ProducerSlug(slug) => video
            .producer_id
            .as_ref()
            .and_then(|id| tables.producers.get(id))
            .is_some_and(|p| &p.slug == slug),
    }
}

#[async_trait]
impl CatalogStore for MockCatalogStore {
    async fn get_video(&self, id: &str) -> CatalogResult<Video> {
        Self::check(&self.fail_reads, "read")?;
        self.video(id)
            .ok_or_else(|| CatalogError::NotFound(format!("video {}", id)))
    }

    async fn find_videos(&self, query: &VideoQuery) -> CatalogResult<Vec<Video>> {
        Self::check(&self.fail_reads, "read")?;
        let tables = self.tables.lock().unwrap();
        let mut found: Vec<Video> = tables
            .videos
            .values()
            .filter(|v| matches_filter(&tables, v, &query.filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn sample_videos(&self, limit: u32) -> CatalogResult<Vec<Video>> {
        Self::check(&self.fail_reads, "read")?;
        let mut all: Vec<Video> = self.tables.lock().unwrap().videos.values().cloned().collect();
        all.shuffle(&mut rand::thread_rng());
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn count_videos(&self) -> CatalogResult<u64> {
        Self::check(&self.fail_reads, "read")?;
        Ok(self.tables.lock().unwrap().videos.len() as u64)
    }

    async fn replace_video(&self, video: &Video) -> CatalogResult<Video> {
        Self::check(&self.fail_writes, "write")?;
        let mut tables = self.tables.lock().unwrap();

        let dangling_producer = video
            .producer_id
            .as_ref()
            .is_some_and(|id| !tables.producers.contains_key(id));
        let dangling_category = video
            .category_id
            .as_ref()
            .is_some_and(|id| !tables.categories.contains_key(id));
        if dangling_producer || dangling_category {
            return Err(CatalogError::Store(
                "Constraint violation: FOREIGN KEY constraint failed".to_string(),
            ));
        }

        let mut stored = video.clone();
        stored.producer = None;
        stored.category = None;
        if let Some(existing) = tables.videos.get(&video.id) {
            stored.created_at = existing.created_at;
        }
        tables.videos.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn increment_views(&self, id: &str, delta: u64) -> CatalogResult<()> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_increments, "increment")?;
        let mut tables = self.tables.lock().unwrap();
        let video = tables
            .videos
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(format!("video {}", id)))?;
        video.views += delta;
        Ok(())
    }

    async fn producers_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Producer>> {
        self.producer_lookups.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_relations, "relation")?;
        let tables = self.tables.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.producers.get(id).cloned())
            .collect())
    }

    async fn categories_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Category>> {
        self.category_lookups.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_relations, "relation")?;
        let tables = self.tables.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.categories.get(id).cloned())
            .collect())
    }

    async fn list_producers(&self) -> CatalogResult<Vec<Producer>> {
        Self::check(&self.fail_reads, "read")?;
        let mut producers: Vec<Producer> =
            self.tables.lock().unwrap().producers.values().cloned().collect();
        producers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(producers)
    }

    async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        Self::check(&self.fail_reads, "read")?;
        let mut categories: Vec<Category> =
            self.tables.lock().unwrap().categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn create_producer(&self, producer: &Producer) -> CatalogResult<()> {
        Self::check(&self.fail_writes, "write")?;
        let mut tables = self.tables.lock().unwrap();
        if tables.producers.values().any(|p| p.slug == producer.slug) {
            return Err(CatalogError::Store(
                "Constraint violation: UNIQUE constraint failed: producers.slug".to_string(),
            ));
        }
        tables
            .producers
            .insert(producer.id.clone(), producer.clone());
        Ok(())
    }

    async fn create_category(&self, category: &Category) -> CatalogResult<()> {
        Self::check(&self.fail_writes, "write")?;
        let mut tables = self.tables.lock().unwrap();
        if tables.categories.values().any(|c| c.slug == category.slug) {
            return Err(CatalogError::Store(
                "Constraint violation: UNIQUE constraint failed: categories.slug".to_string(),
            ));
        }
        tables
            .categories
            .insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn seed_catalog(
        &self,
        categories: &[Category],
        producers: &[Producer],
        videos: &[Video],
    ) -> CatalogResult<Option<SeedReport>> {
        Self::check(&self.fail_writes, "write")?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.videos.is_empty() {
            return Ok(None);
        }

        // Staged on a copy so a failure leaves nothing behind.
        let mut staged = tables.clone();
        let mut report = SeedReport::default();

        let mut category_ids = HashMap::new();
        for category in categories {
            let stored = match staged.categories.values().find(|c| c.slug == category.slug) {
                Some(existing) => existing.id.clone(),
                None => {
                    staged
                        .categories
                        .insert(category.id.clone(), category.clone());
                    report.categories += 1;
                    category.id.clone()
                }
            };
            category_ids.insert(category.id.clone(), stored);
        }

        let mut producer_ids = HashMap::new();
        for producer in producers {
            let stored = match staged.producers.values().find(|p| p.slug == producer.slug) {
                Some(existing) => existing.id.clone(),
                None => {
                    staged
                        .producers
                        .insert(producer.id.clone(), producer.clone());
                    report.producers += 1;
                    producer.id.clone()
                }
            };
            producer_ids.insert(producer.id.clone(), stored);
        }

        for video in videos {
            let mut stored = video.clone();
            stored.producer = None;
            stored.category = None;
            if let Some(id) = &video.producer_id {
                stored.producer_id =
                    Some(producer_ids.get(id).cloned().unwrap_or_else(|| id.clone()));
            }
            if let Some(id) = &video.category_id {
                stored.category_id =
                    Some(category_ids.get(id).cloned().unwrap_or_else(|| id.clone()));
            }

            let dangling_producer = stored
                .producer_id
                .as_ref()
                .is_some_and(|id| !staged.producers.contains_key(id));
            let dangling_category = stored
                .category_id
                .as_ref()
                .is_some_and(|id| !staged.categories.contains_key(id));
            if dangling_producer || dangling_category {
                return Err(CatalogError::Store(
                    "Constraint violation: FOREIGN KEY constraint failed".to_string(),
                ));
            }
            staged.videos.insert(stored.id.clone(), stored);
            report.videos += 1;
        }

        *tables = staged;
        Ok(Some(report))
    }

    async fn health_check(&self) -> CatalogResult<()> {
        Self::check(&self.fail_reads, "read")
    }
}
