//! Testing utilities: an in-memory [`CatalogStore`](crate::catalog::CatalogStore)
//! and entity fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use videocat_core::testing::{fixtures, MockCatalogStore};
//!
//! let store = MockCatalogStore::new();
//! store.add_video(fixtures::video("v1", "Epic Action Sequence"));
//! store.set_fail_relations(true);
//!
//! // Hand it to a CatalogEngine, then inspect store.producer_lookups()...
//! ```

mod mock_store;

pub use mock_store::MockCatalogStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::catalog::{Category, Producer, Video};

    /// A fixed point in time, `minutes` after 2024-01-01T00:00:00Z.
    pub fn timestamp(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    /// Create a test video with no relations and zero views.
    pub fn video(id: &str, title: &str) -> Video {
        Video {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("Amazing {} content", title),
            url: format!("https://example.com/{}.mp4", id),
            thumbnail: format!("https://example.com/{}.jpg", id),
            duration: 180,
            views: 0,
            producer_id: None,
            category_id: None,
            created_at: timestamp(0),
            updated_at: timestamp(0),
            producer: None,
            category: None,
        }
    }

    /// Create a test producer; the name is derived from the slug.
    pub fn producer(id: &str, slug: &str) -> Producer {
        Producer {
            id: id.to_string(),
            name: title_case(slug),
            slug: slug.to_string(),
            description: format!("{} makes videos", title_case(slug)),
            avatar: format!("https://example.com/avatars/{}.jpg", slug),
            specialties: vec!["Action".to_string(), "Drama".to_string()],
            rating: 4.8,
            followers: 125_000,
            video_count: 0,
            created_at: timestamp(0),
            updated_at: timestamp(0),
        }
    }

    /// Create a test category; the name is derived from the slug.
    pub fn category(id: &str, slug: &str) -> Category {
        Category {
            id: id.to_string(),
            name: title_case(slug),
            slug: slug.to_string(),
            description: format!("{} videos", title_case(slug)),
            icon: "📹".to_string(),
            video_count: 0,
            created_at: timestamp(0),
            updated_at: timestamp(0),
        }
    }

    fn title_case(slug: &str) -> String {
        slug.split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}
