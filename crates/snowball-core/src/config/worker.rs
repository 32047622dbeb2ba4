//! Background worker configuration.

use serde::{Deserialize, Serialize};

use crate::types::queue;

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fixed worker identifier; a random one is generated when unset.
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Delay between polls of an empty queue, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How long a claimed job stays locked without renewal.
    #[serde(default = "default_lock_duration")]
    pub lock_duration_ms: u64,
    /// Interval between stalled-job sweeps.
    #[serde(default = "default_stall_interval")]
    pub stall_check_interval_ms: u64,
    /// Upper bound on waiting for in-flight jobs at shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
    /// Attempts given to a job when the enqueuer does not specify any.
    #[serde(default = "default_attempts")]
    pub default_attempts: i32,
    /// Base delay of the default exponential backoff.
    #[serde(default = "default_backoff")]
    pub default_backoff_ms: i64,
    /// Grace period before completed jobs are purged.
    #[serde(default = "default_completed_retention")]
    pub completed_retention_hours: i64,
    /// Retention for failed jobs; failed jobs are kept forever when unset.
    #[serde(default)]
    pub failed_retention_days: Option<i64>,
    /// Per-queue concurrency limits.
    #[serde(default)]
    pub queues: QueueConcurrency,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            worker_id: None,
            poll_interval_ms: default_poll_interval(),
            lock_duration_ms: default_lock_duration(),
            stall_check_interval_ms: default_stall_interval(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
            default_attempts: default_attempts(),
            default_backoff_ms: default_backoff(),
            completed_retention_hours: default_completed_retention(),
            failed_retention_days: None,
            queues: QueueConcurrency::default(),
        }
    }
}

/// Number of jobs each named queue may run at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConcurrency {
    /// `email-processing`: depth-0 CSV ingestion and verification.
    #[serde(default = "default_email_processing")]
    pub email_processing: usize,
    /// `digest-generation`: digest dispatch and delivery.
    #[serde(default = "default_digest_generation")]
    pub digest_generation: usize,
    /// `snowball-distribution`: recursive waves, sweeps, analysis.
    #[serde(default = "default_snowball_distribution")]
    pub snowball_distribution: usize,
    /// `data-cleanup`: maintenance.
    #[serde(default = "default_data_cleanup")]
    pub data_cleanup: usize,
}

impl QueueConcurrency {
    /// Queue names paired with their concurrency.
    pub fn entries(&self) -> [(&'static str, usize); 4] {
        [
            (queue::EMAIL_PROCESSING, self.email_processing),
            (queue::DIGEST_GENERATION, self.digest_generation),
            (queue::SNOWBALL_DISTRIBUTION, self.snowball_distribution),
            (queue::DATA_CLEANUP, self.data_cleanup),
        ]
    }

    /// Concurrency of a named queue, if it is one of the built-in queues.
    pub fn for_queue(&self, name: &str) -> Option<usize> {
        self.entries()
            .into_iter()
            .find(|(queue, _)| *queue == name)
            .map(|(_, concurrency)| concurrency)
    }
}

impl Default for QueueConcurrency {
    fn default() -> Self {
        Self {
            email_processing: default_email_processing(),
            digest_generation: default_digest_generation(),
            snowball_distribution: default_snowball_distribution(),
            data_cleanup: default_data_cleanup(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    500
}

fn default_lock_duration() -> u64 {
    30_000
}

fn default_stall_interval() -> u64 {
    30_000
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_attempts() -> i32 {
    3
}

fn default_backoff() -> i64 {
    2000
}

fn default_completed_retention() -> i64 {
    24
}

fn default_email_processing() -> usize {
    10
}

fn default_digest_generation() -> usize {
    5
}

fn default_snowball_distribution() -> usize {
    3
}

fn default_data_cleanup() -> usize {
    1
}
