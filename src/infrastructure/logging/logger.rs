use super::config::{LogConfig, LogFormat};
use anyhow::Result;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE_NAME: &str = "layercache.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logger implementation using tracing
pub struct LoggerImpl {
    guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber described by `config`.
    ///
    /// Keep the returned value alive for the life of the process: it owns
    /// the background writer of the log file.
    ///
    /// # Errors
    /// Returns an error for an unknown level or if a global subscriber is
    /// already installed
    pub fn init(config: &LogConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let filter = || {
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy()
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if let Some(ref log_dir) = config.log_dir {
            let appender = if config.rotate_daily {
                rolling::daily(log_dir, LOG_FILE_NAME)
            } else {
                rolling::never(log_dir, LOG_FILE_NAME)
            };
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);

            // File output is always JSON for structured ingestion
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(filter())
                    .boxed(),
            );
        }

        if config.enable_stdout {
            let stdout_layer = match config.format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stdout)
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_filter(filter())
                    .boxed(),
                LogFormat::Pretty => tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stdout)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_filter(filter())
                    .boxed(),
            };
            layers.push(stdout_layer);
        }

        tracing_subscriber::registry().with(layers).try_init()?;

        tracing::info!(
            level = %config.level,
            format = ?config.format,
            file_output = config.log_dir.is_some(),
            "logger initialized"
        );

        Ok(Self { guard })
    }

    /// Whether a file writer is attached
    pub const fn has_file_output(&self) -> bool {
        self.guard.is_some()
    }
}

/// Parse log level string to Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}
