//! Demo data for an empty catalog.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::catalog::{CatalogResult, CatalogStore, Category, Producer, Video};

pub use crate::catalog::SeedReport;

const THUMBNAIL: &str = "/placeholder-video.jpg";

const GENERATED_TITLES: [&str; 18] = [
    "Documentary Truth",
    "Comedy Central",
    "Epic Adventure",
    "Thriller Night",
    "Romance Story",
    "Sci-Fi Future",
    "Horror Tales",
    "Musical Journey",
    "Sports Highlights",
    "Travel Diary",
    "Cooking Show",
    "Tech Review",
    "Gaming Session",
    "Art Tutorial",
    "Fashion Show",
    "News Report",
    "Interview Special",
    "Behind Scenes",
];

/// Insert demo categories, producers and videos when the catalog has no
/// videos. Returns `None` when seeding was skipped.
///
/// The whole batch commits or none of it does. Categories and producers whose
/// slug already exists are reused, so leftovers from an earlier run never block
/// start-up.
pub async fn seed_if_empty(store: &dyn CatalogStore) -> CatalogResult<Option<SeedReport>> {
    let categories = demo_categories();
    let producers = demo_producers();
    let videos = demo_videos(&producers, &categories);

    let Some(report) = store
        .seed_catalog(&categories, &producers, &videos)
        .await?
    else {
        tracing::debug!("Catalog already has videos, skipping seed");
        return Ok(None);
    };

    tracing::info!(
        videos = report.videos,
        producers = report.producers,
        categories = report.categories,
        "Seeded empty catalog"
    );
    Ok(Some(report))
}

fn demo_categories() -> Vec<Category> {
    [
        ("Action", "action", "High-octane action videos", "💥"),
        ("Comedy", "comedy", "Funny and entertaining content", "😂"),
        ("Drama", "drama", "Dramatic storytelling", "🎭"),
        ("Documentary", "documentary", "Real-world stories", "📹"),
    ]
    .into_iter()
    .map(|(name, slug, description, icon)| Category {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        ..Default::default()
    })
    .collect()
}

fn demo_producers() -> Vec<Producer> {
    vec![
        Producer {
            id: Uuid::new_v4().to_string(),
            name: "NUDEX Studios".to_string(),
            slug: "nudex-studios".to_string(),
            description: "Premium content creators".to_string(),
            specialties: vec!["Action".to_string(), "Drama".to_string()],
            rating: 4.8,
            followers: 125_000,
            ..Default::default()
        },
        Producer {
            id: Uuid::new_v4().to_string(),
            name: "RedCam Productions".to_string(),
            slug: "redcam-productions".to_string(),
            description: "Independent filmmakers".to_string(),
            specialties: vec!["Documentary".to_string(), "Comedy".to_string()],
            rating: 4.6,
            followers: 89_000,
            ..Default::default()
        },
    ]
}

fn demo_videos(producers: &[Producer], categories: &[Category]) -> Vec<Video> {
    let now = Utc::now();
    let video = |title: &str, description: String, n: usize, duration: u32, views: u64| Video {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        description,
        url: format!("https://example.com/video{}.mp4", n),
        thumbnail: THUMBNAIL.to_string(),
        duration,
        views,
        producer_id: Some(producers[(n - 1) % producers.len()].id.clone()),
        category_id: Some(categories[(n - 1) % categories.len()].id.clone()),
        // Earlier entries sort first in newest-first listings.
        created_at: now - Duration::seconds(n as i64),
        updated_at: now - Duration::seconds(n as i64),
        producer: None,
        category: None,
    };

    let mut videos = vec![
        video(
            "Epic Action Sequence",
            "Mind-blowing action with stunning visuals".to_string(),
            1,
            180,
            1250,
        ),
        video(
            "Comedy Gold",
            "Hilarious comedy sketch".to_string(),
            2,
            240,
            980,
        ),
    ];

    for (offset, &title) in GENERATED_TITLES.iter().enumerate() {
        let i = offset + 2;
        videos.push(video(
            title,
            format!("Amazing {} content", title),
            i + 1,
            120 + 15 * i as u32,
            500 + 100 * i as u64,
        ));
    }

    videos
}
