//! Job queue CLI commands.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use snowball_core::error::AppError;
use snowball_core::types::id::{JobId, RepositoryId, UserId};
use snowball_entity::job::{Job, JobPayload, ProcessCsvPayload};
use snowball_worker::JobOptions;

/// Arguments for queue commands
#[derive(Debug, Args)]
pub struct QueueArgs {
    /// Queue subcommand
    #[command(subcommand)]
    pub command: QueueCommand,
}

/// Queue subcommands
#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Show job counts per queue and status
    Stats,
    /// List failed jobs
    Failed {
        /// Maximum number of jobs to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// Requeue a failed job with a fresh attempt budget
    Retry {
        /// Job ID
        id: JobId,
    },
    /// Enqueue a CSV upload as a snowball wave
    EnqueueCsv {
        /// Target repository ID
        #[arg(long)]
        repository: RepositoryId,
        /// Uploading user ID
        #[arg(long)]
        user: UserId,
        /// CSV file to read
        #[arg(long)]
        file: String,
        /// Snowball depth of the wave
        #[arg(long, default_value_t = 0)]
        depth: u32,
        /// Source assigned to rows without a source column
        #[arg(long)]
        source: Option<String>,
    },
}

/// Row of the stats table
#[derive(Debug, Serialize, Tabled)]
struct StatRow {
    #[tabled(rename = "Queue")]
    queue: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Jobs")]
    count: i64,
}

/// Row of the failed-jobs table
#[derive(Debug, Serialize, Tabled)]
struct FailedRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Queue")]
    queue: String,
    #[tabled(rename = "Type")]
    job_type: String,
    #[tabled(rename = "Attempts")]
    attempts: String,
    #[tabled(rename = "Error")]
    error: String,
    #[tabled(rename = "Failed At")]
    failed_at: String,
}

impl From<Job> for FailedRow {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.to_string(),
            queue: job.queue,
            job_type: job.job_type,
            attempts: format!("{}/{}", job.attempts, job.max_attempts),
            error: job.error_message.unwrap_or_default(),
            failed_at: job
                .completed_at
                .as_ref()
                .map(DateTime::<Utc>::to_rfc3339)
                .unwrap_or_default(),
        }
    }
}

/// Execute queue commands
pub async fn execute(
    args: &QueueArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (_store, queue) = super::open_queue(&config).await?;

    match &args.command {
        QueueCommand::Stats => {
            let rows: Vec<StatRow> = queue
                .stats()
                .await?
                .into_iter()
                .map(|s| StatRow {
                    queue: s.queue,
                    status: s.status.to_string(),
                    count: s.count,
                })
                .collect();
            output::print_list(&rows, format);
        }
        QueueCommand::Failed { limit } => {
            let rows: Vec<FailedRow> = queue
                .failed(*limit)
                .await?
                .into_iter()
                .map(FailedRow::from)
                .collect();
            output::print_list(&rows, format);
        }
        QueueCommand::Retry { id } => {
            if queue.retry_failed(*id).await? {
                output::print_success(&format!("Job {id} requeued"));
            } else {
                output::print_warning(&format!("Job {id} is not a failed job"));
            }
        }
        QueueCommand::EnqueueCsv {
            repository,
            user,
            file,
            depth,
            source,
        } => {
            let csv_payload = tokio::fs::read_to_string(file).await?;
            let payload = JobPayload::ProcessCsv(ProcessCsvPayload {
                repository_id: *repository,
                csv_payload,
                user_id: *user,
                depth: *depth,
                source: source.clone(),
                contact_list_id: None,
            });
            let job = queue.enqueue_payload(&payload, JobOptions::default()).await?;
            output::print_success(&format!("Job '{}' enqueued on '{}' (id: {})", job.job_type, job.queue, job.id));
        }
    }

    Ok(())
}
