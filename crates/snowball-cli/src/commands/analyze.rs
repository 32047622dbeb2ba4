//! Network analysis CLI command.

use clap::Args;

use crate::output::{self, OutputFormat};
use snowball_cache::CacheManager;
use snowball_core::error::AppError;
use snowball_core::types::id::RepositoryId;
use snowball_entity::job::{AnalyzeNetworkPayload, JobPayload};
use snowball_service::NetworkAnalyzer;
use snowball_worker::JobOptions;

/// Arguments for the analyze command
#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Repository to analyze
    pub repository: RepositoryId,

    /// Enqueue an `analyze-network` job instead of computing in-process
    #[arg(long)]
    pub enqueue: bool,
}

/// Execute the analyze command
pub async fn execute(
    args: &AnalyzeArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (store, queue) = super::open_queue(&config).await?;

    if args.enqueue {
        let payload = JobPayload::AnalyzeNetwork(AnalyzeNetworkPayload {
            repository_id: args.repository,
        });
        let job = queue.enqueue_payload(&payload, JobOptions::default()).await?;
        output::print_success(&format!("Analysis enqueued (id: {})", job.id));
        return Ok(());
    }

    let cache = CacheManager::new(&config.cache)?;
    let analyzer = NetworkAnalyzer::new(store, cache, &config.snowball);
    let snapshot = analyzer.analyze(args.repository, true).await?;

    match format {
        OutputFormat::Json => output::print_item(&snapshot, format),
        OutputFormat::Table => {
            println!("Network analysis for {}:", snapshot.repository_id);
            output::print_kv("Total reach", &snapshot.total_reach.to_string());
            output::print_kv("Avg engagement", &format!("{:.4}", snapshot.avg_engagement));
            output::print_kv("Growth rate", &format!("{:.4}", snapshot.growth_rate));
            output::print_kv("Analyzed at", &snapshot.analyzed_at.to_rfc3339());
            for (rank, contributor) in snapshot.top_contributors.iter().enumerate() {
                output::print_kv(
                    &format!("Contributor #{}", rank + 1),
                    &format!("{} ({} emails)", contributor.user_id, contributor.emails_contributed),
                );
            }
        }
    }
    Ok(())
}
