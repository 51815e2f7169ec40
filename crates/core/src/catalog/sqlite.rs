//! SQLite-backed catalog store.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};

use super::pool::{build_pool, pool_error, DatabaseTarget, SqlitePool};
use super::schema::{self, CATEGORIES_TABLE, PRODUCERS_TABLE, VIDEOS_TABLE};
use super::types::{decode_timestamp, encode_timestamp};
use super::{
    CatalogError, CatalogResult, CatalogStore, Category, Producer, SeedReport, Video, VideoFilter,
    VideoQuery,
};
use crate::config::DatabaseConfig;

/// Random probes per requested row before falling back to a short scan.
const PROBES_PER_ROW: u32 = 4;

const INSERT_PRODUCER: &str =
    "INSERT INTO producers (id, name, slug, description, avatar, specialties, rating,
                            followers, video_count, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)";

const INSERT_CATEGORY: &str =
    "INSERT INTO categories (id, name, slug, description, icon, video_count,
                             created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)";

/// SQLite-backed catalog store over a connection pool.
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    /// Open (creating if needed) the database file named in `config` and
    /// bring its schema up to date.
    pub async fn open(config: &DatabaseConfig) -> CatalogResult<Self> {
        Self::with_target(DatabaseTarget::File(config.path.clone()), config).await
    }

    /// Create an in-memory store (useful for testing).
    pub async fn in_memory() -> CatalogResult<Self> {
        Self::with_target(DatabaseTarget::Memory, &DatabaseConfig::default()).await
    }

    async fn with_target(target: DatabaseTarget, config: &DatabaseConfig) -> CatalogResult<Self> {
        let pool = build_pool(target, config)?;
        let store = Self { pool };
        store.with_conn(schema::migrate).await?;
        Ok(store)
    }

    /// Close the pool. Connections are dropped as they are returned.
    pub fn close(&self) {
        self.pool.close();
    }

    pub fn pool_status(&self) -> deadpool::Status {
        self.pool.status()
    }

    /// Run `op` with a pooled connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, op: F) -> CatalogResult<T>
    where
        F: FnOnce(&Connection) -> CatalogResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.get().await.map_err(pool_error)?;
        tokio::task::spawn_blocking(move || op(&*conn))
            .await
            .map_err(|e| CatalogError::Internal(format!("Blocking store task failed: {}", e)))?
    }

    /// Column order follows `VIDEOS_TABLE`.
    fn row_to_video(row: &Row) -> rusqlite::Result<Video> {
        Ok(Video {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            url: row.get(3)?,
            thumbnail: row.get(4)?,
            duration: row.get(5)?,
            views: row.get(6)?,
            producer_id: row.get(7)?,
            category_id: row.get(8)?,
            created_at: timestamp_at(row, 9)?,
            updated_at: timestamp_at(row, 10)?,
            producer: None,
            category: None,
        })
    }

    /// Column order follows `PRODUCERS_TABLE`.
    fn row_to_producer(row: &Row) -> rusqlite::Result<Producer> {
        let specialties: String = row.get(5)?;
        let rating: f64 = row.get(6)?;

        Ok(Producer {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            description: row.get(3)?,
            avatar: row.get(4)?,
            specialties: serde_json::from_str(&specialties).map_err(|e| conversion_error(5, e))?,
            rating: rating as f32,
            followers: row.get(7)?,
            video_count: row.get(8)?,
            created_at: timestamp_at(row, 9)?,
            updated_at: timestamp_at(row, 10)?,
        })
    }

    /// Column order follows `CATEGORIES_TABLE`.
    fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            description: row.get(3)?,
            icon: row.get(4)?,
            video_count: row.get(5)?,
            created_at: timestamp_at(row, 6)?,
            updated_at: timestamp_at(row, 7)?,
        })
    }

    fn collect<T>(
        rows: impl Iterator<Item = rusqlite::Result<T>>,
    ) -> CatalogResult<Vec<T>> {
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn find(conn: &Connection, query: &VideoQuery) -> CatalogResult<Vec<Video>> {
        let (join, condition, arg) = match &query.filter {
            VideoFilter::All => ("", "1 = 1", None),
            VideoFilter::Text(text) => (
                "",
                "(contains_ci(v.title, ?3) OR contains_ci(v.description, ?3))",
                Some(text.to_lowercase()),
            ),
            VideoFilter::CategorySlug(slug) => (
                "JOIN categories c ON c.id = v.category_id",
                "c.slug = ?3",
                Some(slug.clone()),
            ),
            VideoFilter::ProducerSlug(slug) => (
                "JOIN producers p ON p.id = v.producer_id",
                "p.slug = ?3",
                Some(slug.clone()),
            ),
        };

        let sql = format!(
            "SELECT {} FROM videos v {} WHERE {}
             ORDER BY v.created_at DESC, v.id ASC
             LIMIT ?1 OFFSET ?2",
            VIDEOS_TABLE.column_list(Some("v")),
            join,
            condition
        );

        let mut stmt = conn.prepare(&sql)?;
        let limit = query.limit as i64;
        let offset = query.offset as i64;
        let rows = match arg {
            Some(arg) => stmt.query_map(params![limit, offset, arg], Self::row_to_video)?,
            None => stmt.query_map(params![limit, offset], Self::row_to_video)?,
        };
        Self::collect(rows)
    }

    /// Bounded-cost random sample.
    ///
    /// Small catalogs are read whole and shuffled. Larger ones are probed at
    /// random rowids (`rowid >= r`, an index seek), at most
    /// `PROBES_PER_ROW * limit` times; any shortfall left by collisions is
    /// filled by scanning forward from a random rowid, wrapping once. Rows that
    /// follow rowid gaps are picked more often than others.
    fn sample(conn: &Connection, limit: u32) -> CatalogResult<Vec<Video>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let limit = limit as usize;
        let columns = VIDEOS_TABLE.column_list(None);
        let mut rng = rand::thread_rng();

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
        if total as usize <= limit {
            let mut stmt = conn.prepare(&format!("SELECT {} FROM videos", columns))?;
            let mut all = Self::collect(stmt.query_map([], Self::row_to_video)?)?;
            all.shuffle(&mut rng);
            return Ok(all);
        }

        let (lo, hi): (i64, i64) = conn.query_row(
            "SELECT MIN(rowid), MAX(rowid) FROM videos",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut seen: HashSet<i64> = HashSet::with_capacity(limit);
        let mut picked: Vec<Video> = Vec::with_capacity(limit);
        let map_row = |row: &Row| -> rusqlite::Result<(i64, Video)> {
            Ok((row.get(11)?, Self::row_to_video(row)?))
        };

        let mut probe = conn.prepare(&format!(
            "SELECT {}, rowid FROM videos WHERE rowid >= ?1 ORDER BY rowid LIMIT 1",
            columns
        ))?;
        for _ in 0..(limit as u32).saturating_mul(PROBES_PER_ROW) {
            if picked.len() == limit {
                break;
            }
            let target = rng.gen_range(lo..=hi);
            if let Some((rowid, video)) = probe.query_row(params![target], map_row).optional()? {
                if seen.insert(rowid) {
                    picked.push(video);
                }
            }
        }

        if picked.len() < limit {
            let start = rng.gen_range(lo..=hi);
            let scans = [
                format!(
                    "SELECT {}, rowid FROM videos WHERE rowid >= ?1 ORDER BY rowid LIMIT ?2",
                    columns
                ),
                format!(
                    "SELECT {}, rowid FROM videos WHERE rowid < ?1 ORDER BY rowid LIMIT ?2",
                    columns
                ),
            ];
            for sql in &scans {
                if picked.len() == limit {
                    break;
                }
                // Over-fetch by the number already picked so skipped rows never
                // leave the scan short.
                let want = (limit - picked.len() + seen.len()) as i64;
                let mut stmt = conn.prepare(sql)?;
                for row in stmt.query_map(params![start, want], map_row)? {
                    let (rowid, video) = row?;
                    if picked.len() == limit {
                        break;
                    }
                    if seen.insert(rowid) {
                        picked.push(video);
                    }
                }
            }
        }

        picked.shuffle(&mut rng);
        Ok(picked)
    }

    fn insert_producer(
        conn: &Connection,
        sql: &str,
        producer: &Producer,
        now: &str,
    ) -> CatalogResult<usize> {
        let specialties = serde_json::to_string(&producer.specialties)
            .map_err(|e| CatalogError::Internal(e.to_string()))?;
        conn.execute(
            sql,
            params![
                &producer.id,
                &producer.name,
                &producer.slug,
                &producer.description,
                &producer.avatar,
                &specialties,
                producer.rating as f64,
                producer.followers as i64,
                producer.video_count as i64,
                now,
            ],
        )
        .map_err(write_error)
    }

    fn insert_category(
        conn: &Connection,
        sql: &str,
        category: &Category,
        now: &str,
    ) -> CatalogResult<usize> {
        conn.execute(
            sql,
            params![
                &category.id,
                &category.name,
                &category.slug,
                &category.description,
                &category.icon,
                category.video_count as i64,
                now,
            ],
        )
        .map_err(write_error)
    }

    /// Insert the batch inside one transaction. Slug conflicts keep the stored
    /// row; videos follow the ids that ended up stored.
    fn seed(
        conn: &Connection,
        categories: &[Category],
        producers: &[Producer],
        videos: &[Video],
    ) -> CatalogResult<Option<SeedReport>> {
        let tx = conn.unchecked_transaction()?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(None);
        }

        let now = encode_timestamp(&Utc::now());
        let mut report = SeedReport::default();

        let insert_category = format!("{} ON CONFLICT(slug) DO NOTHING", INSERT_CATEGORY);
        let mut category_ids: HashMap<&str, String> = HashMap::new();
        for category in categories {
            report.categories += Self::insert_category(&tx, &insert_category, category, &now)?;
            let stored: String = tx.query_row(
                "SELECT id FROM categories WHERE slug = ?1",
                params![&category.slug],
                |row| row.get(0),
            )?;
            category_ids.insert(category.id.as_str(), stored);
        }

        let insert_producer = format!("{} ON CONFLICT(slug) DO NOTHING", INSERT_PRODUCER);
        let mut producer_ids: HashMap<&str, String> = HashMap::new();
        for producer in producers {
            report.producers += Self::insert_producer(&tx, &insert_producer, producer, &now)?;
            let stored: String = tx.query_row(
                "SELECT id FROM producers WHERE slug = ?1",
                params![&producer.slug],
                |row| row.get(0),
            )?;
            producer_ids.insert(producer.id.as_str(), stored);
        }

        for video in videos {
            tx.execute(
                "INSERT INTO videos (id, title, description, url, thumbnail, duration, views,
                                     producer_id, category_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    &video.id,
                    &video.title,
                    &video.description,
                    &video.url,
                    &video.thumbnail,
                    video.duration,
                    video.views as i64,
                    remap(&video.producer_id, &producer_ids),
                    remap(&video.category_id, &category_ids),
                    encode_timestamp(&video.created_at),
                    encode_timestamp(&video.updated_at),
                ],
            )
            .map_err(write_error)?;
            report.videos += 1;
        }

        tx.commit()?;
        Ok(Some(report))
    }

    fn by_ids<T>(
        conn: &Connection,
        table: &str,
        columns: &str,
        ids: &[String],
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> CatalogResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE id IN ({})",
            columns, table, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), map)?;
        Self::collect(rows)
    }
}

/// Follow a seeded reference to the row that ended up stored.
fn remap(id: &Option<String>, ids: &HashMap<&str, String>) -> Option<String> {
    id.as_ref()
        .map(|id| ids.get(id.as_str()).cloned().unwrap_or_else(|| id.clone()))
}

/// Read a stored timestamp, failing the row when it does not parse.
fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    decode_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Map a write failure, keeping constraint violations recognisable.
fn write_error(err: rusqlite::Error) -> CatalogError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            CatalogError::Store(format!(
                "Constraint violation: {}",
                msg.as_deref().unwrap_or("unknown constraint")
            ))
        }
        _ => CatalogError::from(err),
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn get_video(&self, id: &str) -> CatalogResult<Video> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM videos WHERE id = ?1",
                    VIDEOS_TABLE.column_list(None)
                ),
                params![&id],
                Self::row_to_video,
            )
            .optional()?
            .ok_or_else(|| CatalogError::NotFound(format!("video {}", id)))
        })
        .await
    }

    async fn find_videos(&self, query: &VideoQuery) -> CatalogResult<Vec<Video>> {
        let query = query.clone();
        self.with_conn(move |conn| Self::find(conn, &query)).await
    }

    async fn sample_videos(&self, limit: u32) -> CatalogResult<Vec<Video>> {
        self.with_conn(move |conn| Self::sample(conn, limit)).await
    }

    async fn count_videos(&self) -> CatalogResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn replace_video(&self, video: &Video) -> CatalogResult<Video> {
        let video = video.clone();
        self.with_conn(move |conn| {
            let sql = format!(
                "INSERT INTO videos (id, title, description, url, thumbnail, duration, views,
                                     producer_id, category_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     description = excluded.description,
                     url = excluded.url,
                     thumbnail = excluded.thumbnail,
                     duration = excluded.duration,
                     views = excluded.views,
                     producer_id = excluded.producer_id,
                     category_id = excluded.category_id,
                     updated_at = excluded.updated_at
                 RETURNING {}",
                VIDEOS_TABLE.column_list(None)
            );

            conn.query_row(
                &sql,
                params![
                    &video.id,
                    &video.title,
                    &video.description,
                    &video.url,
                    &video.thumbnail,
                    video.duration,
                    video.views as i64,
                    &video.producer_id,
                    &video.category_id,
                    encode_timestamp(&video.created_at),
                    encode_timestamp(&video.updated_at),
                ],
                Self::row_to_video,
            )
            .map_err(write_error)
        })
        .await
    }

    async fn increment_views(&self, id: &str, delta: u64) -> CatalogResult<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE videos SET views = views + ?2 WHERE id = ?1",
                    params![&id, delta as i64],
                )
                .map_err(write_error)?;
            if changed == 0 {
                return Err(CatalogError::NotFound(format!("video {}", id)));
            }
            Ok(())
        })
        .await
    }

    async fn producers_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Producer>> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            Self::by_ids(
                conn,
                PRODUCERS_TABLE.name,
                &PRODUCERS_TABLE.column_list(None),
                &ids,
                Self::row_to_producer,
            )
        })
        .await
    }

    async fn categories_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Category>> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            Self::by_ids(
                conn,
                CATEGORIES_TABLE.name,
                &CATEGORIES_TABLE.column_list(None),
                &ids,
                Self::row_to_category,
            )
        })
        .await
    }

    async fn list_producers(&self) -> CatalogResult<Vec<Producer>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM producers ORDER BY name, id",
                PRODUCERS_TABLE.column_list(None)
            ))?;
            let rows = stmt.query_map([], Self::row_to_producer)?;
            Self::collect(rows)
        })
        .await
    }

    async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM categories ORDER BY name, id",
                CATEGORIES_TABLE.column_list(None)
            ))?;
            let rows = stmt.query_map([], Self::row_to_category)?;
            Self::collect(rows)
        })
        .await
    }

    async fn create_producer(&self, producer: &Producer) -> CatalogResult<()> {
        let producer = producer.clone();
        self.with_conn(move |conn| {
            let now = encode_timestamp(&Utc::now());
            Self::insert_producer(conn, INSERT_PRODUCER, &producer, &now)?;
            Ok(())
        })
        .await
    }

    async fn create_category(&self, category: &Category) -> CatalogResult<()> {
        let category = category.clone();
        self.with_conn(move |conn| {
            let now = encode_timestamp(&Utc::now());
            Self::insert_category(conn, INSERT_CATEGORY, &category, &now)?;
            Ok(())
        })
        .await
    }

    async fn seed_catalog(
        &self,
        categories: &[Category],
        producers: &[Producer],
        videos: &[Video],
    ) -> CatalogResult<Option<SeedReport>> {
        let categories = categories.to_vec();
        let producers = producers.to_vec();
        let videos = videos.to_vec();
        self.with_conn(move |conn| Self::seed(conn, &categories, &producers, &videos))
            .await
    }

    async fn health_check(&self) -> CatalogResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }
}
