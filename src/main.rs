//! layercache CLI entry point.

use clap::Parser;

use layercache::cli::{commands, handle_error, load_config, Cli, Commands};
use layercache::infrastructure::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Workload(args) => {
            async {
                let config = load_config(config_path)?;
                let mut log_config = config.logging.clone();
                // Keep stdout parseable when emitting JSON
                log_config.enable_stdout &= !cli.json;
                let _logger = LoggerImpl::init(&log_config)?;
                commands::workload::execute(args, config, cli.json).await
            }
            .await
        }
        Commands::Config(args) => {
            commands::config::execute(args, || load_config(config_path), cli.json)
        }
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
