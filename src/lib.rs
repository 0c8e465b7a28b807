//! layercache - two-tier cache manager
//!
//! A bounded in-process memory tier (L1) in front of an optional remote
//! tier (L2), with per-entry TTLs, frequency-based eviction, write-through
//! and write-back strategies, memoization and hit/miss statistics. The
//! remote tier is strictly best-effort: its failures and timeouts degrade
//! to misses and never reach callers.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): errors, entries, statistics, configuration
//!   models and the `RemoteTier` / `Clock` ports
//! - **Service Layer** (`services`): memory tier, remote gateway, write-back
//!   worker, cache manager, memoization and the process-wide registry
//! - **Adapters** (`adapters`): in-process and Redis remote tiers
//! - **Infrastructure Layer** (`infrastructure`): configuration loading,
//!   logging and wiring from configuration
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use layercache::{CacheManager, SetOptions, WriteStrategy};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache: CacheManager<u64> = CacheManager::in_memory(1000)?;
//!     cache
//!         .set_with(
//!             "x",
//!             42,
//!             SetOptions::default()
//!                 .with_ttl(Duration::from_secs(60))
//!                 .with_strategy(WriteStrategy::WriteThrough),
//!         )
//!         .await;
//!     assert_eq!(cache.get("x").await, Some(42));
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::InMemoryRemoteTier;
pub use domain::models::{
    Config, ShutdownMode, StatsSnapshot, WriteBackSnapshot, WriteStrategy,
};
pub use domain::ports::{Clock, ManualClock, RemoteTier, SystemClock};
pub use domain::{CacheError, CacheResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CacheManager, CacheManagerBuilder, CacheValue, InvalidationReport, Kwargs, MemoArgs, MemoKey,
    MemoizeOptions, Memoized, MemoizedFn, SetOptions,
};
