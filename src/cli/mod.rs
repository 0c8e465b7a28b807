//! Command-line interface for operating and exercising the cache.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(name = "layercache")]
#[command(about = "layercache - two-tier cache manager", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of .layercache/
    #[arg(short, long, global = true, env = "LAYERCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a synthetic workload and report cache statistics
    Workload(commands::workload::WorkloadArgs),
    /// Inspect or create configuration
    Config(commands::config::ConfigArgs),
}

/// Load configuration from `path`, or from `.layercache/` and the
/// environment when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print an error in the requested format and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
