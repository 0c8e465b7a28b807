pub mod config;
pub mod entry;
pub mod stats;
pub mod strategy;

pub use config::{CacheConfig, Config, RemoteBackend, RemoteConfig, WriteBackConfig};
pub use entry::{CacheEntry, MAX_TTL};
pub use stats::{CacheStatistics, StatsSnapshot, WriteBackSnapshot, WriteBackStats};
pub use strategy::{ShutdownMode, WriteStrategy};
