//! CLI command definitions and dispatch.

pub mod analyze;
pub mod config;
pub mod queue;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use snowball_core::config::AppConfig;
use snowball_core::error::AppError;
use snowball_database::DataStore;
use snowball_worker::JobQueue;

/// Snowball: background jobs and viral list distribution
#[derive(Debug, Parser)]
#[command(name = "snowball", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Job queue inspection and management
    Queue(queue::QueueArgs),
    /// Repository network analysis
    Analyze(analyze::AnalyzeArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Queue(args) => queue::execute(args, &self.config, self.format).await,
            Commands::Analyze(args) => analyze::execute(args, &self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_from(config_path)
}

/// Helper: open the configured store and a queue over it
pub async fn open_queue(config: &AppConfig) -> Result<(DataStore, Arc<JobQueue>), AppError> {
    let store = DataStore::from_config(config).await?;
    let queue = Arc::new(JobQueue::new(
        Arc::clone(&store.jobs),
        &config.worker,
        config.snowball.max_depth,
    ));
    Ok((store, queue))
}
