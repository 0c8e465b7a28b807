//! Domain layer for layercache
//!
//! Error taxonomy, data model and the ports the cache depends on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{CacheError, CacheResult};
