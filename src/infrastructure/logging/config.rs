//! The `logging:` section of the config file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how the cache's tracing events are written. Missing keys take
/// the values of [`LogConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// JSON log file directory; stdout only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub enable_stdout: bool,
    /// Start a new log file each day instead of appending to one file
    pub rotate_daily: bool,
}

/// Stdout encoding. The log file is always JSON.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            log_dir: None,
            enable_stdout: true,
            rotate_daily: true,
        }
    }
}
