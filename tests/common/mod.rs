//! Common test utilities for integration tests
//!
//! Remote tier doubles with controllable behaviour, plus logging and
//! polling helpers shared across integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

use layercache::{CacheError, CacheResult, RemoteTier};

/// Remote tier whose writes block until [`GatedRemoteTier::open`] is called.
///
/// Reads, deletes and listings never block.
pub struct GatedRemoteTier {
    store: Mutex<HashMap<String, String>>,
    gate: Semaphore,
    sets: AtomicUsize,
}

impl GatedRemoteTier {
    /// A tier whose gate starts closed.
    pub fn closed() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            gate: Semaphore::new(0),
            sets: AtomicUsize::new(0),
        }
    }

    /// A tier whose gate starts open.
    pub fn open_now() -> Self {
        let tier = Self::closed();
        tier.open();
        tier
    }

    /// Let every pending and future write through.
    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.store.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    /// Writes that completed.
    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn insert(&self, key: &str, payload: &str) {
        self.store
            .lock()
            .unwrap()
            .insert(key.to_string(), payload.to_string());
    }
}

#[async_trait]
impl RemoteTier for GatedRemoteTier {
    fn name(&self) -> &str {
        "gated"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.stored(key))
    }

    async fn set(&self, key: &str, payload: &str, _ttl: Duration) -> CacheResult<()> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|err| CacheError::remote("set", err))?;
        self.insert(key, payload);
        self.sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.store.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let matcher = layercache::adapters::key_pattern(pattern)?;
        Ok(self
            .store
            .lock()
            .unwrap()
            .keys()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect())
    }

    async fn clear_all(&self) -> CacheResult<()> {
        self.store.lock().unwrap().clear();
        Ok(())
    }
}

/// Remote tier where every operation fails.
#[derive(Default)]
pub struct FailingRemoteTier {
    pub calls: AtomicUsize,
}

impl FailingRemoteTier {
    fn fail<T>(&self, operation: &str) -> CacheResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::remote(operation, "connection refused"))
    }
}

#[async_trait]
impl RemoteTier for FailingRemoteTier {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        self.fail("get")
    }

    async fn set(&self, _key: &str, _payload: &str, _ttl: Duration) -> CacheResult<()> {
        self.fail("set")
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        self.fail("delete")
    }

    async fn keys_matching(&self, _pattern: &str) -> CacheResult<Vec<String>> {
        self.fail("keys")
    }

    async fn clear_all(&self) -> CacheResult<()> {
        self.fail("clear")
    }
}

/// Remote tier where every operation never completes.
#[derive(Default)]
pub struct HangingRemoteTier;

#[async_trait]
impl RemoteTier for HangingRemoteTier {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _payload: &str, _ttl: Duration) -> CacheResult<()> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        std::future::pending().await
    }

    async fn keys_matching(&self, _pattern: &str) -> CacheResult<Vec<String>> {
        std::future::pending().await
    }

    async fn clear_all(&self) -> CacheResult<()> {
        std::future::pending().await
    }
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 10ms until it returns true or the timeout is
/// reached. Returns whether the condition was met.
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    predicate()
}
