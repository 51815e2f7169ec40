//! Preparing an ingestion payload for a full-record replace.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::{CatalogError, CatalogResult, Video};

/// Validate and normalize `video` for `replace_video`.
///
/// - Title and URL must be non-blank; nothing is written otherwise.
/// - A blank id gets a fresh UUID v4.
/// - Blank producer/category references mean "no reference".
/// - Embedded relations are ignored; only the id columns are stored.
/// - Both timestamps are set to `now`. The store keeps the existing
///   `created_at` when the id already exists.
pub(crate) fn prepare(mut video: Video, now: DateTime<Utc>) -> CatalogResult<Video> {
    if video.title.trim().is_empty() {
        return Err(CatalogError::missing_field("title"));
    }
    if video.url.trim().is_empty() {
        return Err(CatalogError::missing_field("url"));
    }

    if video.id.trim().is_empty() {
        video.id = Uuid::new_v4().to_string();
    }

    video.producer_id = non_blank(video.producer_id);
    video.category_id = non_blank(video.category_id);
    video.producer = None;
    video.category = None;
    video.created_at = now;
    video.updated_at = now;

    Ok(video)
}

fn non_blank(reference: Option<String>) -> Option<String> {
    reference.filter(|id| !id.trim().is_empty())
}
