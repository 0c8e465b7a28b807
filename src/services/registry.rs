//! Optional process-wide cache accessor.
//!
//! Prefer passing an `Arc<CacheManager<_>>` to consumers. This registry
//! exists for call sites that cannot be threaded through, and holds a
//! manager over dynamic JSON values.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde_json::Value;

use crate::domain::errors::{CacheError, CacheResult};
use crate::services::cache_manager::{CacheManager, CacheManagerBuilder};

static GLOBAL_CACHE: Registry = Registry::new();

/// A manager slot that is filled at most once.
pub struct Registry {
    manager: OnceLock<Arc<CacheManager<Value>>>,
    // Serializes builds so a losing caller never spawns a write-back worker
    init: Mutex<()>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            manager: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Build and store a manager. Fails without building if one is stored.
    pub fn initialize(
        &self,
        builder: CacheManagerBuilder<Value>,
    ) -> CacheResult<Arc<CacheManager<Value>>> {
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if self.manager.get().is_some() {
            return Err(CacheError::AlreadyInitialized);
        }
        let manager = Arc::new(builder.build()?);
        self.manager
            .set(manager.clone())
            .map_err(|_| CacheError::AlreadyInitialized)?;
        Ok(manager)
    }

    pub fn instance(&self) -> Option<Arc<CacheManager<Value>>> {
        self.manager.get().cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build and register the process-wide manager. Fails if one is already
/// registered; the remote tier cannot be swapped afterwards.
pub fn initialize(builder: CacheManagerBuilder<Value>) -> CacheResult<Arc<CacheManager<Value>>> {
    GLOBAL_CACHE.initialize(builder)
}

/// The process-wide manager, if [`initialize`] has run.
pub fn instance() -> Option<Arc<CacheManager<Value>>> {
    GLOBAL_CACHE.instance()
}
