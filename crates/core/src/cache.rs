//! Optional cache connection, used only as a liveness signal.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::Client;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::CacheConfig;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cache URL: {0}")]
    InvalidUrl(String),

    #[error("Cache unreachable: {0}")]
    Unreachable(String),

    #[error("Cache did not answer within {0:?}")]
    Timeout(Duration),
}

/// Lazily connected redis client that can answer "is the cache up?".
///
/// The connection is established on the first ping, so a cache that is down at
/// startup only shows up as disconnected in health checks.
pub struct CacheProbe {
    client: Client,
    conn: Mutex<Option<ConnectionManager>>,
}

impl CacheProbe {
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
        })
    }

    /// Send `PING`, connecting first if needed.
    pub async fn ping(&self) -> Result<(), CacheError> {
        tokio::time::timeout(PING_TIMEOUT, self.ping_inner())
            .await
            .map_err(|_| CacheError::Timeout(PING_TIMEOUT))?
    }

    async fn ping_inner(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Unreachable(e.to_string()))?;
        tracing::trace!(reply = %reply, "Cache ping");
        Ok(())
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| CacheError::Unreachable(e.to_string()))?;
        tracing::info!("Connected to cache");
        *slot = Some(conn.clone());
        Ok(conn)
    }
}
