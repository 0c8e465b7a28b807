use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{Config, RemoteBackend};
use crate::services::write_back::MAX_QUEUE_CAPACITY;

/// Directory holding project configuration, relative to the working directory
pub const CONFIG_DIR: &str = ".layercache";

/// Prefix for environment overrides, e.g. `LAYERCACHE_CACHE__L1_CAPACITY`
pub const ENV_PREFIX: &str = "LAYERCACHE_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid l1_capacity: {0}. Must be at least 1")]
    InvalidCapacity(usize),

    #[error("Invalid default_ttl_secs: {0}. Must be at least 1")]
    InvalidDefaultTtl(u64),

    #[error("Invalid write_back.queue_capacity: {0}. Must be at least 1")]
    InvalidQueueCapacity(usize),

    #[error("write_back.queue_capacity too large: {0}. Must be at most {max}", max = MAX_QUEUE_CAPACITY)]
    QueueCapacityTooLarge(usize),

    #[error("remote.timeout_ms is required when remote.backend is {0:?}")]
    MissingRemoteTimeout(RemoteBackend),

    #[error("Invalid remote.timeout_ms: {0}. Must be at least 1")]
    InvalidRemoteTimeout(u64),

    #[error("remote.url is required when remote.backend is {0:?}")]
    MissingRemoteUrl(RemoteBackend),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .layercache/config.yaml
    /// 3. .layercache/local.yaml (optional local overrides)
    /// 4. Environment variables (LAYERCACHE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same precedence as [`load`](Self::load), reading YAML files from `dir`
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.cache.l1_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(config.cache.l1_capacity));
        }

        if config.cache.default_ttl_secs == 0 {
            return Err(ConfigError::InvalidDefaultTtl(config.cache.default_ttl_secs));
        }

        if config.write_back.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(
                config.write_back.queue_capacity,
            ));
        }

        if config.write_back.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::QueueCapacityTooLarge(
                config.write_back.queue_capacity,
            ));
        }

        let backend = config.remote.backend;
        if backend != RemoteBackend::None {
            match config.remote.timeout_ms {
                None => return Err(ConfigError::MissingRemoteTimeout(backend)),
                Some(0) => return Err(ConfigError::InvalidRemoteTimeout(0)),
                Some(_) => {}
            }
        }

        if backend == RemoteBackend::Redis
            && config.remote.url.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::MissingRemoteUrl(backend));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::WriteStrategy;
    use std::fs;

    fn memory_remote(timeout_ms: Option<u64>) -> Config {
        let mut config = Config::default();
        config.remote.backend = RemoteBackend::Memory;
        config.remote.timeout_ms = timeout_ms;
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        ConfigLoader::validate(&Config::default()).expect("Default config should be valid");
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = Config::default();
        config.cache.l1_capacity = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.cache.default_ttl_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidDefaultTtl(0))
        ));
    }

    #[test]
    fn test_validate_zero_queue() {
        let mut config = Config::default();
        config.write_back.queue_capacity = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidQueueCapacity(0))
        ));
    }

    #[test]
    fn test_validate_oversized_queue() {
        let mut config = Config::default();
        config.write_back.queue_capacity = usize::MAX;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::QueueCapacityTooLarge(usize::MAX))
        ));

        config.write_back.queue_capacity = MAX_QUEUE_CAPACITY;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_remote_requires_timeout() {
        assert!(matches!(
            ConfigLoader::validate(&memory_remote(None)),
            Err(ConfigError::MissingRemoteTimeout(RemoteBackend::Memory))
        ));
        assert!(matches!(
            ConfigLoader::validate(&memory_remote(Some(0))),
            Err(ConfigError::InvalidRemoteTimeout(0))
        ));
        assert!(ConfigLoader::validate(&memory_remote(Some(50))).is_ok());
    }

    #[test]
    fn test_redis_requires_url() {
        let mut config = Config::default();
        config.remote.backend = RemoteBackend::Redis;
        config.remote.timeout_ms = Some(100);
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::MissingRemoteUrl(RemoteBackend::Redis))
        ));

        config.remote.url = Some("redis://127.0.0.1/".to_string());
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "cache:\n  l1_capacity: 200\n  default_strategy: write_back\nlogging:\n  level: info\n",
        )
        .unwrap();
        fs::write(dir.path().join("local.yaml"), "cache:\n  l1_capacity: 300\n").unwrap();

        // Holds the temp-env lock so env tests cannot leak into this one
        let config = temp_env::with_vars_unset(
            [
                "LAYERCACHE_CACHE__L1_CAPACITY",
                "LAYERCACHE_REMOTE__BACKEND",
                "LAYERCACHE_REMOTE__TIMEOUT_MS",
            ],
            || ConfigLoader::load_from_dir(dir.path()).unwrap(),
        );
        assert_eq!(config.cache.l1_capacity, 300, "Local override should win");
        assert_eq!(
            config.cache.default_strategy,
            WriteStrategy::WriteBack,
            "Base value should persist when not overridden"
        );
        assert_eq!(config.cache.default_ttl_secs, 3600);
    }

    #[test]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "cache:\n  l1_capacity: 200\n").unwrap();

        temp_env::with_vars(
            [
                ("LAYERCACHE_CACHE__L1_CAPACITY", Some("500")),
                ("LAYERCACHE_REMOTE__BACKEND", Some("memory")),
                ("LAYERCACHE_REMOTE__TIMEOUT_MS", Some("75")),
            ],
            || {
                let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
                assert_eq!(config.cache.l1_capacity, 500);
                assert_eq!(config.remote.backend, RemoteBackend::Memory);
                assert_eq!(config.remote.timeout_ms, Some(75));
            },
        );
    }

    #[test]
    fn test_env_missing_timeout_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                ("LAYERCACHE_REMOTE__BACKEND", Some("memory")),
                ("LAYERCACHE_REMOTE__TIMEOUT_MS", None::<&str>),
            ],
            || {
                let err = ConfigLoader::load_from_dir(dir.path()).unwrap_err();
                assert!(err.to_string().contains("timeout_ms"));
            },
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.yaml");
        fs::write(&path, "write_back:\n  queue_capacity: 16\n  shutdown: abandon\n").unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.write_back.queue_capacity, 16);
    }
}
