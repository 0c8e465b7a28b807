use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::CacheResult;

/// Network-backed key/value store used as the second cache tier.
///
/// Payloads are JSON text produced by [`codec`](crate::services::codec);
/// implementations store them opaquely. Any method may fail; the cache
/// manager absorbs those failures.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    /// Short backend name used in log events
    fn name(&self) -> &str {
        "remote"
    }

    /// Fetch a payload
    ///
    /// # Returns
    /// * `Ok(Some(payload))` if present and unexpired
    /// * `Ok(None)` if absent
    /// * `Err(CacheError)` on backend failure
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a payload that expires after `ttl`
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove a key; absent keys are not an error
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Remove several keys at once
    ///
    /// The default issues one `delete` per key and stops at the first
    /// failure. Backends with a native batch delete should override it.
    async fn delete_many(&self, keys: &[String]) -> CacheResult<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }

    /// List keys matching a glob pattern (`*` any run, `?` one char,
    /// `\` escapes the next char)
    async fn keys_matching(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Remove every key
    async fn clear_all(&self) -> CacheResult<()>;
}
