//! Entity types for the video catalog.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A video asset.
///
/// `producer` and `category` are never stored; they are attached on read by the
/// relationship resolver and omitted from JSON when unset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Video {
    /// Stable identifier (UUID v4 when generated by upsert).
    pub id: String,
    pub title: String,
    pub description: String,
    /// Playback URL.
    pub url: String,
    pub thumbnail: String,
    /// Duration in seconds.
    pub duration: u32,
    pub views: u64,
    pub producer_id: Option<String>,
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<Producer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// A content producer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Producer {
    pub id: String,
    pub name: String,
    /// Unique, human-readable lookup key. Never updated once assigned.
    pub slug: String,
    pub description: String,
    pub avatar: String,
    /// Specialty tags, persisted as a JSON array.
    pub specialties: Vec<String>,
    /// Rating in the 0.0-5.0 range.
    pub rating: f32,
    pub followers: u64,
    /// Denormalized number of videos.
    pub video_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A video category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Unique, human-readable lookup key. Never updated once assigned.
    pub slug: String,
    pub description: String,
    /// Icon glyph (usually a single emoji).
    pub icon: String,
    /// Denormalized number of videos.
    pub video_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which videos a [`VideoQuery`] selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoFilter {
    /// Every video.
    All,
    /// Case-insensitive substring of title or description.
    Text(String),
    /// Videos whose category has exactly this slug.
    CategorySlug(String),
    /// Videos whose producer has exactly this slug.
    ProducerSlug(String),
}

/// A filtered, paginated video lookup.
///
/// Results are ordered newest first, ties broken by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoQuery {
    pub filter: VideoFilter,
    pub limit: u32,
    pub offset: u32,
}

impl VideoQuery {
    pub fn new(filter: VideoFilter) -> Self {
        Self {
            filter,
            limit: 10,
            offset: 0,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

/// Rows a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub videos: usize,
    pub producers: usize,
    pub categories: usize,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn missing_field(field: &'static str) -> Self {
        CatalogError::Validation {
            field,
            message: format!("{} is required", field),
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogError::Store(err.to_string())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Fixed-width RFC 3339 encoding so stored timestamps sort lexicographically.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}
