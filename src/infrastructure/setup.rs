//! Setup and wiring infrastructure
//!
//! - Default config file creation
//! - Remote tier construction from configuration
//! - Cache manager construction from configuration

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::InMemoryRemoteTier;
use crate::domain::models::config::{Config, RemoteBackend, RemoteConfig};
use crate::domain::ports::RemoteTier;
use crate::infrastructure::config::loader::CONFIG_DIR;
use crate::services::{CacheManager, CacheValue};

/// Default configuration template content
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# layercache configuration
# Override settings by editing this file or setting environment variables
# with LAYERCACHE_ prefix
#
# Example environment variables:
#   export LAYERCACHE_CACHE__L1_CAPACITY=5000
#   export LAYERCACHE_REMOTE__BACKEND=redis
#   export LAYERCACHE_REMOTE__TIMEOUT_MS=50
#   export LAYERCACHE_LOGGING__LEVEL=debug

# Memory tier
cache:
  # Maximum entries held in process
  l1_capacity: 1000

  # TTL used when a caller gives none, and when warming from the remote tier
  default_ttl_secs: 3600

  # write_through or write_back
  default_strategy: "write_through"

# Remote tier
remote:
  # none, memory or redis
  backend: "none"

  # Connection URL (redis only)
  # url: "redis://127.0.0.1:6379/0"

  # Per-call timeout in milliseconds; required whenever backend is not none
  # timeout_ms: 50

# Write-back worker
write_back:
  # Queued remote writes beyond this are dropped
  queue_capacity: 1024

  # drain or abandon pending writes at shutdown
  shutdown: "drain"

# Logging configuration
logging:
  # Log level: trace, debug, info, warn, error
  level: "info"

  # Log format: json, pretty
  format: "json"

  # Directory for a JSON log file (optional)
  # log_dir: ".layercache/logs"
"#;

/// Write the default config file into `dir`, creating the directory.
/// Existing files are kept unless `force` is set.
pub fn create_config_file(dir: impl AsRef<Path>, force: bool) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let path = dir.join("config.yaml");
    if path.exists() && !force {
        return Ok(path);
    }

    fs::create_dir_all(dir).context("Failed to create config directory")?;
    fs::write(&path, DEFAULT_CONFIG_TEMPLATE).context("Failed to write config file")?;
    Ok(path)
}

/// Config directory under the current working directory
pub fn default_config_dir() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    Ok(current_dir.join(CONFIG_DIR))
}

/// Construct the configured remote tier, if any
pub async fn build_remote_tier(config: &RemoteConfig) -> Result<Option<Arc<dyn RemoteTier>>> {
    match config.backend {
        RemoteBackend::None => Ok(None),
        RemoteBackend::Memory => Ok(Some(Arc::new(InMemoryRemoteTier::new()))),
        RemoteBackend::Redis => connect_redis(config).await.map(Some),
    }
}

#[cfg(feature = "redis")]
async fn connect_redis(config: &RemoteConfig) -> Result<Arc<dyn RemoteTier>> {
    let url = config
        .url
        .as_deref()
        .context("remote.url is required for the redis backend")?;
    let tier = crate::adapters::RedisRemoteTier::connect(url)
        .await
        .context("Failed to connect to redis")?;
    Ok(Arc::new(tier))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_config: &RemoteConfig) -> Result<Arc<dyn RemoteTier>> {
    bail!("the redis backend requires building layercache with `--features redis`")
}

/// Build a cache manager from validated configuration
pub async fn build_manager<V: CacheValue>(config: &Config) -> Result<CacheManager<V>> {
    let mut builder = CacheManager::builder()
        .capacity(config.cache.l1_capacity)
        .default_ttl(config.cache.default_ttl())
        .default_strategy(config.cache.default_strategy)
        .write_back_queue(config.write_back.queue_capacity);

    if let Some(tier) = build_remote_tier(&config.remote).await? {
        let Some(timeout) = config.remote.timeout() else {
            bail!("remote.timeout_ms is required when a remote backend is configured");
        };
        builder = builder.remote_tier(tier, timeout);
    }

    builder.build().context("Failed to build cache manager")
}
