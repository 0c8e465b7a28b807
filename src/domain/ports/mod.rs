//! Port trait definitions (Hexagonal Architecture)
//!
//! - Clock: monotonic time for TTL math
//! - RemoteTier: optional network-backed second tier
//!
//! Adapters for `RemoteTier` live in [`crate::adapters`].

pub mod clock;
pub mod remote_tier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use remote_tier::RemoteTier;
