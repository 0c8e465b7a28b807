//! `RemoteTier` adapters.
//!
//! - `memory`: in-process store with latency and failure injection
//! - `redis`: Redis server (behind the `redis` feature)

pub mod memory_remote;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory_remote::{key_pattern, InMemoryRemoteTier, RemoteCallCounts};
#[cfg(feature = "redis")]
pub use self::redis::RedisRemoteTier;
