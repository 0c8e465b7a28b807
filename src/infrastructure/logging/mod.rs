//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stdout output
//! - Optional rolling log file (always JSON)

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat};
pub use logger::LoggerImpl;
