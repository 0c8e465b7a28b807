use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::strategy::{ShutdownMode, WriteStrategy};
use crate::infrastructure::logging::LogConfig;

/// Main configuration structure for layercache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Memory tier and default write behaviour
    #[serde(default)]
    pub cache: CacheConfig,

    /// Remote tier backend
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Write-back worker
    #[serde(default)]
    pub write_back: WriteBackConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,
}

/// Memory tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Maximum number of entries held in the memory tier
    #[serde(default = "default_l1_capacity")]
    pub l1_capacity: usize,

    /// TTL applied when a caller does not supply one, and when warming from L2
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Strategy applied when a caller does not supply one
    #[serde(default)]
    pub default_strategy: WriteStrategy,
}

const fn default_l1_capacity() -> usize {
    1000
}

const fn default_ttl_secs() -> u64 {
    3600
}

impl CacheConfig {
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_capacity: default_l1_capacity(),
            default_ttl_secs: default_ttl_secs(),
            default_strategy: WriteStrategy::default(),
        }
    }
}

/// Which remote tier, if any, backs the memory tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    /// Memory tier only
    #[default]
    None,
    /// In-process store, useful for local runs and tests
    Memory,
    /// Redis server (requires the `redis` feature)
    Redis,
}

/// Remote tier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RemoteConfig {
    #[serde(default)]
    pub backend: RemoteBackend,

    /// Connection URL, required for redis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Per-call timeout in milliseconds. Has no default: it must be set
    /// whenever a backend is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Write-back worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WriteBackConfig {
    /// Bounded queue size; writes beyond it are dropped and logged
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Behaviour for pending writes at shutdown
    #[serde(default)]
    pub shutdown: ShutdownMode,
}

const fn default_queue_capacity() -> usize {
    1024
}

impl Default for WriteBackConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            shutdown: ShutdownMode::default(),
        }
    }
}
