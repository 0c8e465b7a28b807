//! Domain errors for the layercache system.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur inside the cache.
///
/// Remote-tier variants never reach callers of
/// [`CacheManager`](crate::services::CacheManager): they are absorbed at the
/// gateway and turned into misses or no-ops.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Remote tier {operation} failed: {message}")]
    Remote { operation: String, message: String },

    #[error("Remote tier {operation} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cache registry already initialized")]
    AlreadyInitialized,

    #[error("Invalid cache configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// Build a remote failure for `operation` from any displayable error.
    pub fn remote(operation: &str, err: impl std::fmt::Display) -> Self {
        Self::Remote {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this error came from the remote tier (including timeouts).
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Timeout { .. })
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
