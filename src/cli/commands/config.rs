//! Configuration commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::setup;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (defaults, files and environment merged)
    Show,
    /// Check that the configuration loads and validates
    Validate,
    /// Write a default config.yaml
    Init {
        /// Target directory (defaults to ./.layercache)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    pub config: Config,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .unwrap_or_else(|err| format!("failed to render configuration: {err}"))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigValidateOutput {
    pub valid: bool,
    pub l1_capacity: usize,
    pub remote_backend: String,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        format!(
            "Configuration is valid (l1_capacity: {}, remote: {})",
            self.l1_capacity, self.remote_backend
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigInitOutput {
    pub path: PathBuf,
}

impl CommandOutput for ConfigInitOutput {
    fn to_human(&self) -> String {
        format!("Configuration written to {}", self.path.display())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// `load` is deferred so that `init` works before any config exists.
pub fn execute(
    args: ConfigArgs,
    load: impl FnOnce() -> Result<Config>,
    json_mode: bool,
) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = load()?;
            output(&ConfigShowOutput { config }, json_mode);
        }
        ConfigCommands::Validate => {
            let config = load()?;
            let remote_backend = serde_json::to_value(config.remote.backend)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            output(
                &ConfigValidateOutput {
                    valid: true,
                    l1_capacity: config.cache.l1_capacity,
                    remote_backend,
                },
                json_mode,
            );
        }
        ConfigCommands::Init { dir, force } => {
            let dir = match dir {
                Some(dir) => dir,
                None => setup::default_config_dir()?,
            };
            let path = setup::create_config_file(&dir, force)
                .with_context(|| format!("Failed to initialize {}", dir.display()))?;
            output(&ConfigInitOutput { path }, json_mode);
        }
    }
    Ok(())
}
