//! Infrastructure layer
//!
//! Configuration loading, logging setup and wiring of the cache from
//! configuration.

pub mod config;
pub mod logging;
pub mod setup;

pub use config::{ConfigError, ConfigLoader};
pub use logging::{LogConfig, LoggerImpl};
