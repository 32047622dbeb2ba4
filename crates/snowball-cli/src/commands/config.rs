//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use snowball_core::error::AppError;
use snowball_database::mask_password;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file + environment)
    Show,
    /// Validate configuration file
    Validate,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = super::load_config(config_path)?;
            config.database.url = mask_password(&config.database.url);
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => {
            let config = super::load_config(config_path)?;
            output::print_success(&format!("Configuration '{config_path}' is valid"));
            output::print_kv("Store", &config.store.backend);
            output::print_kv("Database", &mask_password(&config.database.url));
            output::print_kv("Max depth", &config.snowball.max_depth.to_string());
            output::print_kv(
                "Quality threshold",
                &config.snowball.quality_threshold.to_string(),
            );
            for (queue, concurrency) in config.worker.queues.entries() {
                output::print_kv(queue, &concurrency.to_string());
            }
        }
    }

    Ok(())
}
