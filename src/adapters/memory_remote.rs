//! In-process remote tier.
//!
//! Behaves like a shared key/value server (TTL per key, glob key listing)
//! without leaving the process. Latency and failures can be injected, which
//! makes it the default stand-in for local runs and the CLI workload.

use async_trait::async_trait;
use glob::Pattern;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::MAX_TTL;
use crate::domain::ports::{Clock, RemoteTier, SystemClock};

#[derive(Debug, Clone)]
struct StoredPayload {
    payload: String,
    expires_at: Instant,
}

/// Call counters, for observing how the cache uses the remote tier.
#[derive(Debug, Default)]
pub struct RemoteCallCounts {
    pub gets: AtomicU64,
    pub sets: AtomicU64,
    pub deletes: AtomicU64,
}

/// `RemoteTier` backed by a map in this process.
pub struct InMemoryRemoteTier {
    entries: RwLock<HashMap<String, StoredPayload>>,
    clock: Arc<dyn Clock>,
    latency: Option<Duration>,
    failing: AtomicBool,
    calls: RemoteCallCounts,
}

impl InMemoryRemoteTier {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock: Arc::new(SystemClock),
            latency: None,
            failing: AtomicBool::new(false),
            calls: RemoteCallCounts::default(),
        }
    }

    /// Delay every call by `latency` to imitate a network hop.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    pub const fn calls(&self) -> &RemoteCallCounts {
        &self.calls
    }

    /// Number of stored keys, expired ones included until touched.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Raw payload for `key`, bypassing expiry, latency and failure injection.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|stored| stored.payload.clone())
    }

    async fn enter(&self, operation: &str) -> CacheResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::Acquire) {
            return Err(CacheError::remote(operation, "injected failure"));
        }
        Ok(())
    }
}

impl Default for InMemoryRemoteTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteTier for InMemoryRemoteTier {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.calls.gets.fetch_add(1, Ordering::Relaxed);
        self.enter("get").await?;

        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(stored) if stored.expires_at > now => Ok(Some(stored.payload.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> CacheResult<()> {
        self.calls.sets.fetch_add(1, Ordering::Relaxed);
        self.enter("set").await?;

        let now = self.clock.now();
        let expires_at = now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now);
        self.entries.write().await.insert(
            key.to_string(),
            StoredPayload {
                payload: payload.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.calls.deletes.fetch_add(1, Ordering::Relaxed);
        self.enter("delete").await?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> CacheResult<()> {
        self.calls
            .deletes
            .fetch_add(keys.len() as u64, Ordering::Relaxed);
        self.enter("delete_many").await?;
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.enter("keys_matching").await?;
        let matcher = key_pattern(pattern)?;
        let now = self.clock.now();
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|(key, stored)| stored.expires_at > now && matcher.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn clear_all(&self) -> CacheResult<()> {
        self.enter("clear_all").await?;
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Compile a remote-tier key pattern (`*`, `?`, `\x` for a literal `x`)
/// into a `glob::Pattern`.
pub fn key_pattern(pattern: &str) -> CacheResult<Pattern> {
    let mut translated = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(literal) => translated.push_str(&Pattern::escape(&literal.to_string())),
                None => translated.push('\\'),
            },
            other => translated.push(other),
        }
    }
    Pattern::new(&translated).map_err(|err| CacheError::remote("keys_matching", err))
}
