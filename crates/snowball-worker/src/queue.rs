//! Job queue: enqueue, claim, settle and inspect background jobs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use snowball_core::config::WorkerConfig;
use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::types::id::JobId;
use snowball_database::{JobStore, QueueStatusCount, StallReport};
use snowball_entity::job::{BackoffPolicy, Job, JobPayload, JobStatus, NewJob};

/// Per-job overrides applied at enqueue time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Maximum attempts; the queue default when unset.
    pub attempts: Option<i32>,
    /// Retry schedule; the queue default when unset.
    pub backoff: Option<BackoffPolicy>,
    /// Delay before the first attempt.
    pub delay_ms: i64,
    /// Claim priority (higher first).
    pub priority: i32,
}

impl JobOptions {
    /// Options with only a delay and priority set.
    pub fn delayed(delay_ms: i64, priority: i32) -> Self {
        Self {
            delay_ms,
            priority,
            ..Self::default()
        }
    }
}

/// How a failed attempt was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The job will run again at `run_at`.
    Retrying {
        /// Next eligible time.
        run_at: DateTime<Utc>,
    },
    /// The job is failed and retained with its error.
    Failed,
    /// The worker no longer owned the job; nothing was changed.
    LockLost,
}

/// Job queue for enqueuing and dequeuing work
#[derive(Debug, Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    default_attempts: i32,
    default_backoff: BackoffPolicy,
    lock_duration: Duration,
    max_depth: u32,
}

impl JobQueue {
    /// Create a new job queue
    pub fn new(store: Arc<dyn JobStore>, config: &WorkerConfig, max_depth: u32) -> Self {
        Self {
            store,
            default_attempts: config.default_attempts.max(1),
            default_backoff: BackoffPolicy::exponential(config.default_backoff_ms),
            lock_duration: Duration::milliseconds(config.lock_duration_ms as i64),
            max_depth,
        }
    }

    /// Lock duration given to claimed jobs.
    pub fn lock_duration(&self) -> Duration {
        self.lock_duration
    }

    /// Enqueue a job on `queue`.
    ///
    /// A `process-csv` payload deeper than the maximum depth is refused with
    /// a validation error.
    pub async fn enqueue(
        &self,
        queue: &str,
        payload: &JobPayload,
        options: JobOptions,
    ) -> AppResult<Job> {
        if let Some(depth) = payload.depth().filter(|d| *d > self.max_depth) {
            return Err(AppError::validation(format!(
                "Refusing to enqueue snowball depth {depth}; maximum is {}",
                self.max_depth
            )));
        }

        let new = NewJob {
            queue: queue.to_string(),
            job_type: payload.job_type().to_string(),
            payload: serde_json::to_value(payload)?,
            max_attempts: options.attempts.unwrap_or(self.default_attempts),
            backoff: options.backoff.unwrap_or(self.default_backoff),
            priority: options.priority,
            delay_ms: options.delay_ms,
        };
        let job = Job::from_new(new, Utc::now());
        self.store.insert(&job).await?;

        debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            queue = %job.queue,
            priority = job.priority,
            delay_ms = job.delay_ms,
            "Enqueued job"
        );
        Ok(job)
    }

    /// Enqueue a job on the payload's default queue.
    pub async fn enqueue_payload(&self, payload: &JobPayload, options: JobOptions) -> AppResult<Job> {
        self.enqueue(payload.default_queue(), payload, options).await
    }

    /// Claim the next eligible job of `queue` for `worker_id`.
    pub async fn claim(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>> {
        let now = Utc::now();
        let job = self
            .store
            .claim_next(queue, worker_id, now, now + self.lock_duration)
            .await?;
        if let Some(job) = &job {
            debug!(job_id = %job.id, job_type = %job.job_type, queue, attempt = job.attempts, "Claimed job");
        }
        Ok(job)
    }

    /// Extend the lock of a job owned by `worker_id`.
    pub async fn renew(&self, id: JobId, worker_id: &str) -> AppResult<bool> {
        self.store
            .renew_lock(id, worker_id, Utc::now() + self.lock_duration)
            .await
    }

    /// Mark a job completed. Returns `false` if the lock was lost.
    pub async fn complete(
        &self,
        job: &Job,
        worker_id: &str,
        result: Option<&serde_json::Value>,
    ) -> AppResult<bool> {
        let applied = self.store.complete(job.id, worker_id, result, Utc::now()).await?;
        if !applied {
            warn!(job_id = %job.id, worker_id, "Completion ignored; job lock was lost");
        }
        Ok(applied)
    }

    /// Settle a failed attempt: retry with backoff while attempts remain and
    /// the failure is retryable, otherwise fail the job.
    pub async fn fail(
        &self,
        job: &Job,
        worker_id: &str,
        error: &str,
        retryable: bool,
    ) -> AppResult<FailureOutcome> {
        let now = Utc::now();
        if retryable && job.has_attempts_left() {
            let run_at = now + job.backoff.delay_for(job.attempts);
            if self
                .store
                .schedule_retry(job.id, worker_id, error, run_at, now)
                .await?
            {
                return Ok(FailureOutcome::Retrying { run_at });
            }
        } else if self.store.fail(job.id, worker_id, error, now).await? {
            return Ok(FailureOutcome::Failed);
        }
        warn!(job_id = %job.id, worker_id, "Failure ignored; job lock was lost");
        Ok(FailureOutcome::LockLost)
    }

    /// Requeue (or fail) active jobs whose lock expired.
    pub async fn recover_stalled(&self) -> AppResult<StallReport> {
        let report = self.store.recover_stalled(Utc::now()).await?;
        if report.requeued > 0 || report.failed > 0 {
            warn!(requeued = report.requeued, failed = report.failed, "Recovered stalled jobs");
        }
        Ok(report)
    }

    /// Delete jobs that reached `status` more than `older_than` ago.
    pub async fn purge(&self, status: JobStatus, older_than: Duration) -> AppResult<u64> {
        let removed = self.store.purge(status, Utc::now() - older_than).await?;
        if removed > 0 {
            info!(status = %status, removed, "Purged jobs");
        }
        Ok(removed)
    }

    /// Job counts per queue and status.
    pub async fn stats(&self) -> AppResult<Vec<QueueStatusCount>> {
        self.store.count_by_status().await
    }

    /// Most recently failed jobs.
    pub async fn failed(&self, limit: i64) -> AppResult<Vec<Job>> {
        self.store.list_by_status(JobStatus::Failed, limit).await
    }

    /// Reset a failed job to `waiting` with zero attempts.
    pub async fn retry_failed(&self, id: JobId) -> AppResult<bool> {
        let reset = self.store.reset_failed(id, Utc::now()).await?;
        if reset {
            info!(job_id = %id, "Failed job requeued");
        }
        Ok(reset)
    }

    /// Find a job by ID.
    pub async fn get(&self, id: JobId) -> AppResult<Option<Job>> {
        self.store.find_by_id(id).await
    }
}
