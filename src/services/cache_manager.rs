//! Two-tier cache manager.
//!
//! Reads consult the memory tier first and fall back to the optional remote
//! tier, warming the memory tier on a remote hit. Writes always land in the
//! memory tier; the remote write is awaited (`WriteThrough`) or queued
//! (`WriteBack`). Remote failures degrade to memory-only behaviour and are
//! never returned to callers.
//!
//! No per-key ordering is provided: concurrent readers may observe a value
//! that a concurrent writer is replacing.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::{
    CacheStatistics, ShutdownMode, StatsSnapshot, WriteBackSnapshot, WriteStrategy,
};
use crate::domain::ports::{Clock, RemoteTier, SystemClock};
use crate::services::codec;
use crate::services::memory_tier::{MemoryTier, TierLookup, DEFAULT_CAPACITY};
use crate::services::remote_gateway::{substring_glob, RemoteGateway};
use crate::services::write_back::{
    WriteBackJob, WriteBackWorker, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY,
};

/// Default TTL applied when neither the caller nor the builder supplies one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Bounds every cached value must satisfy.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Per-call overrides for [`CacheManager::set_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub strategy: Option<WriteStrategy>,
}

impl SetOptions {
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Keys removed by [`CacheManager::invalidate_pattern`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub l1_removed: usize,
    pub l2_removed: usize,
}

/// Builder for [`CacheManager`].
pub struct CacheManagerBuilder<V> {
    capacity: usize,
    default_ttl: Duration,
    default_strategy: WriteStrategy,
    remote: Option<(Arc<dyn RemoteTier>, Duration)>,
    queue_capacity: usize,
    clock: Arc<dyn Clock>,
    _value: PhantomData<fn() -> V>,
}

impl<V: CacheValue> CacheManagerBuilder<V> {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL,
            default_strategy: WriteStrategy::default(),
            remote: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            clock: Arc::new(SystemClock),
            _value: PhantomData,
        }
    }

    /// Maximum number of memory tier entries.
    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub const fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn default_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Attach a remote tier. Every call to it is bounded by `timeout`.
    #[must_use]
    pub fn remote_tier(mut self, tier: Arc<dyn RemoteTier>, timeout: Duration) -> Self {
        self.remote = Some((tier, timeout));
        self
    }

    /// Bound on queued write-backs.
    #[must_use]
    pub const fn write_back_queue(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the manager. With a remote tier configured this spawns the
    /// write-back worker, so it must run inside a Tokio runtime.
    pub fn build(self) -> CacheResult<CacheManager<V>> {
        if self.capacity == 0 {
            return Err(CacheError::Config("capacity must be at least 1".to_string()));
        }
        if self.default_ttl.is_zero() {
            return Err(CacheError::Config("default TTL must be positive".to_string()));
        }
        if !(1..=MAX_QUEUE_CAPACITY).contains(&self.queue_capacity) {
            return Err(CacheError::Config(format!(
                "write-back queue capacity must be between 1 and {MAX_QUEUE_CAPACITY}, got {}",
                self.queue_capacity
            )));
        }

        let (remote, write_back) = match self.remote {
            Some((tier, timeout)) => {
                if timeout.is_zero() {
                    return Err(CacheError::Config(
                        "remote tier timeout must be positive".to_string(),
                    ));
                }
                if tokio::runtime::Handle::try_current().is_err() {
                    return Err(CacheError::Config(
                        "a remote tier requires a Tokio runtime".to_string(),
                    ));
                }
                let gateway = Arc::new(RemoteGateway::new(tier, timeout));
                let worker = WriteBackWorker::spawn(gateway.clone(), self.queue_capacity);
                (Some(gateway), Some(worker))
            }
            None => (None, None),
        };

        info!(
            capacity = self.capacity,
            default_ttl_secs = self.default_ttl.as_secs(),
            default_strategy = %self.default_strategy,
            remote = remote.as_ref().map_or("none", |g| g.backend()),
            "cache manager created"
        );

        Ok(CacheManager {
            l1: Mutex::new(MemoryTier::new(self.capacity)),
            remote,
            write_back,
            stats: CacheStatistics::new(),
            clock: self.clock,
            default_ttl: self.default_ttl,
            default_strategy: self.default_strategy,
        })
    }
}

impl<V: CacheValue> Default for CacheManagerBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Memory tier plus optional remote tier, with statistics.
pub struct CacheManager<V> {
    l1: Mutex<MemoryTier<V>>,
    remote: Option<Arc<RemoteGateway>>,
    write_back: Option<WriteBackWorker>,
    stats: CacheStatistics,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    default_strategy: WriteStrategy,
}

impl<V> std::fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("remote", &self.remote)
            .field("default_ttl", &self.default_ttl)
            .field("default_strategy", &self.default_strategy)
            .finish_non_exhaustive()
    }
}

impl<V: CacheValue> CacheManager<V> {
    pub fn builder() -> CacheManagerBuilder<V> {
        CacheManagerBuilder::new()
    }

    /// Memory-only manager with default settings.
    pub fn in_memory(capacity: usize) -> CacheResult<Self> {
        Self::builder().capacity(capacity).build()
    }

    fn lock_l1(&self) -> MutexGuard<'_, MemoryTier<V>> {
        // Every tier operation leaves the maps consistent, so a poisoned
        // lock still guards valid state.
        self.l1.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_l1(&self, key: String, value: V, ttl: Duration) {
        let evicted = self.lock_l1().set(key, value, ttl, self.clock.now());
        if evicted.is_some() {
            self.stats.record_evictions(1);
        }
    }

    /// Look up `key` in the memory tier, then the remote tier.
    pub async fn get(&self, key: &str) -> Option<V> {
        let lookup = self.lock_l1().get(key, self.clock.now());
        match lookup {
            TierLookup::Hit(value) => {
                self.stats.record_l1(true);
                debug!(key, tier = "l1", "cache hit");
                return Some(value);
            }
            TierLookup::Expired => self.stats.record_expirations(1),
            TierLookup::Miss => {}
        }
        self.stats.record_l1(false);

        let remote = self.remote.as_ref()?;
        let Some(payload) = remote.get(key).await else {
            self.stats.record_l2(false);
            debug!(key, "cache miss");
            return None;
        };

        match codec::decode::<V>(&payload) {
            Ok(value) => {
                self.stats.record_l2(true);
                debug!(key, tier = "l2", "cache hit, warming memory tier");
                self.store_l1(key.to_string(), value.clone(), self.default_ttl);
                Some(value)
            }
            Err(err) => {
                warn!(key, error = %err, "discarding undecodable remote payload");
                self.stats.record_l2(false);
                None
            }
        }
    }

    /// Store `value` with the default TTL and strategy.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.set_with(key, value, SetOptions::default()).await;
    }

    /// Store `value`, overriding TTL and/or strategy.
    pub async fn set_with(&self, key: impl Into<String>, value: V, options: SetOptions) {
        let key = key.into();
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let strategy = options.strategy.unwrap_or(self.default_strategy);
        self.stats.record_set();

        let Some(remote) = &self.remote else {
            self.store_l1(key, value, ttl);
            return;
        };

        let payload = codec::encode(&value)
            .inspect_err(|err| warn!(key = %key, error = %err, "value not encodable, skipping remote tier"))
            .ok();
        self.store_l1(key.clone(), value, ttl);
        let Some(payload) = payload else {
            return;
        };

        match strategy {
            WriteStrategy::WriteThrough => {
                remote.set(&key, &payload, ttl).await;
            }
            WriteStrategy::WriteBack => {
                if let Some(worker) = &self.write_back {
                    worker.enqueue(WriteBackJob { key, payload, ttl });
                }
            }
        }
    }

    /// Remove `key` from both tiers and skip any write-back queued for it.
    /// Returns whether the memory tier held it.
    pub async fn delete(&self, key: &str) -> bool {
        self.stats.record_delete();
        let removed = self.lock_l1().delete(key);
        if let Some(worker) = &self.write_back {
            worker.cancel(key);
        }
        if let Some(remote) = &self.remote {
            remote.delete(key).await;
        }
        removed
    }

    /// Alias of [`delete`](Self::delete).
    pub async fn invalidate(&self, key: &str) -> bool {
        self.delete(key).await
    }

    /// Remove every key containing `substring` literally, from both tiers.
    /// An empty substring matches every key.
    pub async fn invalidate_pattern(&self, substring: &str) -> InvalidationReport {
        let l1_removed = self.lock_l1().remove_containing(substring).len();
        if let Some(worker) = &self.write_back {
            worker.cancel_containing(substring);
        }

        let mut l2_removed = 0;
        if let Some(remote) = &self.remote {
            let keys: Vec<String> = remote
                .keys_matching(&substring_glob(substring))
                .await
                .into_iter()
                .filter(|key| key.contains(substring))
                .collect();
            if remote.delete_many(&keys).await {
                l2_removed = keys.len();
            }
        }

        info!(substring, l1_removed, l2_removed, "invalidated keys by pattern");
        InvalidationReport {
            l1_removed,
            l2_removed,
        }
    }

    /// Empty both tiers. Statistics are kept.
    pub async fn clear(&self) {
        self.lock_l1().clear();
        if let Some(worker) = &self.write_back {
            worker.cancel_all();
        }
        if let Some(remote) = &self.remote {
            remote.clear_all().await;
        }
        info!("cache cleared");
    }

    /// Drop expired memory tier entries without counting requests.
    pub fn purge_expired(&self) -> usize {
        let purged = self.lock_l1().purge_expired(self.clock.now());
        self.stats.record_expirations(purged as u64);
        purged
    }

    /// Snapshot of the counters, derived rates and memory tier size.
    pub fn stats(&self) -> StatsSnapshot {
        let (size, capacity) = {
            let l1 = self.lock_l1();
            (l1.len(), l1.capacity())
        };
        self.stats.snapshot(size, capacity)
    }

    /// Zero every counter. Cached data is untouched.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Write-back worker counters, if a remote tier is configured.
    pub fn write_back_stats(&self) -> Option<WriteBackSnapshot> {
        self.write_back.as_ref().map(WriteBackWorker::stats)
    }

    /// Stop the write-back worker. Later `WriteBack` sets only reach the
    /// memory tier.
    pub async fn shutdown(&self, mode: ShutdownMode) -> Option<WriteBackSnapshot> {
        match &self.write_back {
            Some(worker) => Some(worker.shutdown(mode).await),
            None => None,
        }
    }

    /// Whether the memory tier holds an unexpired value for `key`. Does not
    /// count as a request or an access.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock_l1().contains_key(key, self.clock.now())
    }

    pub fn len(&self) -> usize {
        self.lock_l1().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_l1().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock_l1().capacity()
    }

    pub const fn has_remote_tier(&self) -> bool {
        self.remote.is_some()
    }

    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub const fn default_strategy(&self) -> WriteStrategy {
        self.default_strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryRemoteTier;
    use crate::domain::ports::ManualClock;

    fn manual_manager(capacity: usize) -> (CacheManager<i64>, ManualClock) {
        let clock = ManualClock::new();
        let manager = CacheManager::builder()
            .capacity(capacity)
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        (manager, clock)
    }

    #[tokio::test]
    async fn test_memory_only_round_trip() {
        let (manager, _clock) = manual_manager(10);
        manager.set("x", 42).await;

        assert_eq!(manager.get("x").await, Some(42));
        assert_eq!(manager.get("y").await, None);

        let stats = manager.stats();
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.l1_hits, 1);
        assert_eq!(stats.l1_misses, 1);
        assert_eq!(stats.l2_hits + stats.l2_misses, 0);
        assert!(!manager.has_remote_tier());
    }

    #[tokio::test]
    async fn test_expiry_counts_as_miss() {
        let (manager, clock) = manual_manager(10);
        manager
            .set_with("x", 1, SetOptions::default().with_ttl(Duration::from_secs(5)))
            .await;

        clock.advance(Duration::from_secs(6));
        assert_eq!(manager.get("x").await, None);

        let stats = manager.stats();
        assert_eq!(stats.l1_misses, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.l1_size, 0);
    }

    #[tokio::test]
    async fn test_eviction_is_counted() {
        let (manager, _clock) = manual_manager(2);
        manager.set("a", 1).await;
        manager.set("b", 2).await;
        manager.set("c", 3).await;

        let stats = manager.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.l1_size, 2);
        assert_eq!(stats.l1_max_size, 2);
    }

    #[tokio::test]
    async fn test_remote_hit_warms_memory_tier() {
        let remote = Arc::new(InMemoryRemoteTier::new());
        remote.set("x", "7", Duration::from_secs(60)).await.unwrap();

        let manager: CacheManager<i64> = CacheManager::builder()
            .remote_tier(remote, Duration::from_secs(1))
            .build()
            .unwrap();

        assert!(!manager.contains_key("x"));
        assert_eq!(manager.get("x").await, Some(7));
        assert!(manager.contains_key("x"));
        assert_eq!(manager.get("x").await, Some(7));

        let stats = manager.stats();
        assert_eq!(stats.l2_hits, 1);
        assert_eq!(stats.l1_hits, 1);
        assert_eq!(stats.total_requests, 2);
        assert!((stats.l2_hit_rate - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let remote = Arc::new(InMemoryRemoteTier::new());
        remote
            .set("x", "{\"not\":\"a number\"}", Duration::from_secs(60))
            .await
            .unwrap();

        let manager: CacheManager<i64> = CacheManager::builder()
            .remote_tier(remote, Duration::from_secs(1))
            .build()
            .unwrap();

        assert_eq!(manager.get("x").await, None);
        assert!(!manager.contains_key("x"));
        assert_eq!(manager.stats().l2_misses, 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (manager, clock) = manual_manager(10);
        manager
            .set_with("short", 1, SetOptions::default().with_ttl(Duration::from_secs(1)))
            .await;
        manager.set("long", 2).await;

        clock.advance(Duration::from_secs(2));
        assert_eq!(manager.purge_expired(), 1);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.stats().total_requests, 0);
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(matches!(
            CacheManager::<i64>::builder().capacity(0).build(),
            Err(CacheError::Config(_))
        ));
        assert!(matches!(
            CacheManager::<i64>::builder().default_ttl(Duration::ZERO).build(),
            Err(CacheError::Config(_))
        ));
    }

    #[test]
    fn test_remote_tier_needs_runtime() {
        let result = CacheManager::<i64>::builder()
            .remote_tier(Arc::new(InMemoryRemoteTier::new()), Duration::from_secs(1))
            .build();
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[tokio::test]
    async fn test_zero_remote_timeout_rejected() {
        let result = CacheManager::<i64>::builder()
            .remote_tier(Arc::new(InMemoryRemoteTier::new()), Duration::ZERO)
            .build();
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
