//! Failure-absorbing front for the remote tier.
//!
//! Every call is bounded by the configured timeout. Errors and timeouts are
//! logged with the operation and key, then reported as a miss or `false`;
//! nothing from the remote tier propagates to cache callers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::RemoteTier;

/// Remote tier plus its per-call timeout.
#[derive(Clone)]
pub struct RemoteGateway {
    tier: Arc<dyn RemoteTier>,
    timeout: Duration,
}

impl std::fmt::Debug for RemoteGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteGateway")
            .field("backend", &self.tier.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemoteGateway {
    pub fn new(tier: Arc<dyn RemoteTier>, timeout: Duration) -> Self {
        Self { tier, timeout }
    }

    pub fn backend(&self) -> &str {
        self.tier.name()
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::Timeout {
                    operation: operation.to_string(),
                    timeout: self.timeout,
                })
            })
    }

    fn log_failure(&self, operation: &str, key: &str, err: &CacheError) {
        warn!(
            backend = self.tier.name(),
            operation,
            key,
            error = %err,
            "remote tier call failed, continuing without it"
        );
    }

    /// Fetch a payload; failures read as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.bounded("get", self.tier.get(key)).await {
            Ok(payload) => payload,
            Err(err) => {
                self.log_failure("get", key, &err);
                None
            }
        }
    }

    /// Store a payload, returning the raw outcome. Used by the write-back
    /// worker, which counts failures itself.
    pub async fn try_set(&self, key: &str, payload: &str, ttl: Duration) -> CacheResult<()> {
        let result = self.bounded("set", self.tier.set(key, payload, ttl)).await;
        if let Err(err) = &result {
            self.log_failure("set", key, err);
        }
        result
    }

    pub async fn set(&self, key: &str, payload: &str, ttl: Duration) -> bool {
        self.try_set(key, payload, ttl).await.is_ok()
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.bounded("delete", self.tier.delete(key)).await {
            Ok(()) => true,
            Err(err) => {
                self.log_failure("delete", key, &err);
                false
            }
        }
    }

    pub async fn delete_many(&self, keys: &[String]) -> bool {
        if keys.is_empty() {
            return true;
        }
        match self.bounded("delete_many", self.tier.delete_many(keys)).await {
            Ok(()) => true,
            Err(err) => {
                self.log_failure("delete_many", &keys.join(","), &err);
                false
            }
        }
    }

    /// List keys matching a glob; failures read as no keys.
    pub async fn keys_matching(&self, pattern: &str) -> Vec<String> {
        match self.bounded("keys_matching", self.tier.keys_matching(pattern)).await {
            Ok(keys) => keys,
            Err(err) => {
                self.log_failure("keys_matching", pattern, &err);
                Vec::new()
            }
        }
    }

    pub async fn clear_all(&self) -> bool {
        match self.bounded("clear_all", self.tier.clear_all()).await {
            Ok(()) => true,
            Err(err) => {
                self.log_failure("clear_all", "*", &err);
                false
            }
        }
    }
}

/// Escape glob metacharacters so `text` matches only itself.
pub fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Glob matching any key that contains `substring` literally.
pub fn substring_glob(substring: &str) -> String {
    format!("*{}*", escape_glob(substring))
}
