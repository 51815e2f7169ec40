//! Batched relationship resolution.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::catalog::{CatalogResult, CatalogStore, Category, Producer, Video};

/// Attaches producer and category records to videos.
///
/// One producer lookup and one category lookup per call, whatever the number
/// of videos; a lookup is skipped when no video references that kind.
/// Dangling references leave the relation empty.
#[derive(Clone)]
pub struct RelationshipResolver {
    store: Arc<dyn CatalogStore>,
}

impl RelationshipResolver {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, mut videos: Vec<Video>) -> CatalogResult<Vec<Video>> {
        let producer_ids = distinct(videos.iter().filter_map(|v| v.producer_id.as_deref()));
        let category_ids = distinct(videos.iter().filter_map(|v| v.category_id.as_deref()));

        let (producers, categories) = tokio::try_join!(
            self.producers(&producer_ids),
            self.categories(&category_ids)
        )?;

        for video in &mut videos {
            video.producer = video
                .producer_id
                .as_ref()
                .and_then(|id| producers.get(id))
                .cloned();
            video.category = video
                .category_id
                .as_ref()
                .and_then(|id| categories.get(id))
                .cloned();
        }

        Ok(videos)
    }

    pub async fn resolve_one(&self, video: Video) -> CatalogResult<Video> {
        let mut resolved = self.resolve(vec![video]).await?;
        // resolve() preserves length.
        Ok(resolved.remove(0))
    }

    async fn producers(&self, ids: &[String]) -> CatalogResult<HashMap<String, Producer>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let found = self.store.producers_by_ids(ids).await?;
        Ok(found.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    async fn categories(&self, ids: &[String]) -> CatalogResult<HashMap<String, Category>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let found = self.store.categories_by_ids(ids).await?;
        Ok(found.into_iter().map(|c| (c.id.clone(), c)).collect())
    }
}

fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    ids.collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}
