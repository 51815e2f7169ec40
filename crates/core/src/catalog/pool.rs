//! Pooled SQLite connections.
//!
//! `rusqlite::Connection` is blocking, so the pool only bounds how many
//! connections exist and how long a caller waits for one; the store runs the
//! actual statements on tokio's blocking pool.

use std::path::PathBuf;
use std::time::Duration;

use deadpool::managed::{self, Metrics, PoolError, RecycleResult};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use super::CatalogError;
use crate::config::DatabaseConfig;

/// Where connections point.
#[derive(Debug, Clone)]
pub enum DatabaseTarget {
    File(PathBuf),
    /// A private in-memory database. Only meaningful with a single connection.
    Memory,
}

/// deadpool manager that opens and health-checks SQLite connections.
#[derive(Debug)]
pub struct SqliteManager {
    target: DatabaseTarget,
    busy_timeout: Duration,
}

impl SqliteManager {
    pub fn new(target: DatabaseTarget, busy_timeout: Duration) -> Self {
        Self {
            target,
            busy_timeout,
        }
    }
}

impl managed::Manager for SqliteManager {
    type Type = Connection;
    type Error = rusqlite::Error;

    async fn create(&self) -> Result<Connection, rusqlite::Error> {
        let conn = match &self.target {
            DatabaseTarget::File(path) => {
                let conn = Connection::open(path)?;
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
                conn
            }
            DatabaseTarget::Memory => Connection::open_in_memory()?,
        };
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        register_functions(&conn)?;
        Ok(conn)
    }

    async fn recycle(&self, conn: &mut Connection, _: &Metrics) -> RecycleResult<rusqlite::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

/// `contains_ci(haystack, needle)`: Unicode case-insensitive substring match.
/// The needle must already be lowercase; a NULL haystack never matches.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "contains_ci",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack: Option<String> = ctx.get(0)?;
            let needle: String = ctx.get(1)?;
            Ok(haystack.is_some_and(|h| h.to_lowercase().contains(&needle)))
        },
    )
}

pub type SqlitePool = managed::Pool<SqliteManager>;

/// Build a pool for `target` using the limits in `config`.
pub fn build_pool(target: DatabaseTarget, config: &DatabaseConfig) -> Result<SqlitePool, CatalogError> {
    let max_size = match target {
        DatabaseTarget::Memory => 1,
        DatabaseTarget::File(_) => config.max_connections.max(1) as usize,
    };
    let acquire_timeout = Duration::from_millis(config.acquire_timeout_ms);

    let manager = SqliteManager::new(target, Duration::from_millis(config.busy_timeout_ms));
    SqlitePool::builder(manager)
        .max_size(max_size)
        .wait_timeout(Some(acquire_timeout))
        .create_timeout(Some(acquire_timeout))
        .recycle_timeout(Some(acquire_timeout))
        .runtime(deadpool::Runtime::Tokio1)
        .build()
        .map_err(|e| CatalogError::Store(format!("Failed to build connection pool: {}", e)))
}

pub(crate) fn pool_error(err: PoolError<rusqlite::Error>) -> CatalogError {
    match err {
        PoolError::Timeout(kind) => {
            CatalogError::Store(format!("Timed out acquiring a database connection ({:?})", kind))
        }
        PoolError::Backend(e) => CatalogError::Store(e.to_string()),
        PoolError::Closed => CatalogError::Store("Connection pool is closed".to_string()),
        other => CatalogError::Store(other.to_string()),
    }
}
