//! Service layer: the cache tiers and the manager that coordinates them.

pub mod cache_manager;
pub mod codec;
pub mod memoize;
pub mod memory_tier;
pub mod registry;
pub mod remote_gateway;
pub mod write_back;

pub use cache_manager::{
    CacheManager, CacheManagerBuilder, CacheValue, InvalidationReport, SetOptions, DEFAULT_TTL,
};
pub use memoize::{Kwargs, MemoArgs, MemoKey, MemoizeOptions, Memoized, MemoizedFn};
pub use memory_tier::{MemoryTier, TierLookup};
pub use remote_gateway::RemoteGateway;
pub use write_back::{WriteBackJob, WriteBackWorker};
