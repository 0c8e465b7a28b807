//! Redis remote tier.
//!
//! Uses a `ConnectionManager`, which reconnects on its own; each call works
//! on a cheap clone of it. Key listing walks `SCAN` cursors instead of
//! issuing a blocking `KEYS`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::RemoteTier;

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// `RemoteTier` backed by a Redis server.
#[derive(Clone)]
pub struct RedisRemoteTier {
    connection: ConnectionManager,
}

impl RedisRemoteTier {
    /// Connect to `url` (for example `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(|e| CacheError::remote("connect", e))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::remote("connect", e))?;
        info!(url, "connected to redis remote tier");
        Ok(Self { connection })
    }

    /// Redis TTLs are whole seconds; round up and never go below one.
    fn ttl_secs(ttl: Duration) -> u64 {
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        secs.max(1)
    }
}

#[async_trait]
impl RemoteTier for RedisRemoteTier {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(|e| CacheError::remote("get", e))
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, payload, Self::ttl_secs(ttl))
            .await
            .map_err(|e| CacheError::remote("set", e))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::remote("delete", e))
    }

    async fn delete_many(&self, keys: &[String]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| CacheError::remote("delete_many", e))
    }

    async fn keys_matching(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::remote("keys_matching", e))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once across rounds
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn clear_all(&self) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let flushed: redis::RedisResult<()> = redis::cmd("FLUSHDB").query_async(&mut conn).await;
        flushed.map_err(|e| CacheError::remote("clear_all", e))
    }
}
