//! Worker runners: one polling loop per queue, pooled with a stall sweeper.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, error, info, trace, warn};

use snowball_core::config::WorkerConfig;
use snowball_core::types::id::JobId;
use snowball_entity::job::Job;

use crate::executor::JobExecutor;
use crate::queue::{FailureOutcome, JobQueue};

/// A job currently executing in this process.
#[derive(Debug, Clone)]
pub struct InFlightJob {
    /// Queue the job was claimed from.
    pub queue: String,
    /// Job type.
    pub job_type: String,
    /// Attempt number being executed.
    pub attempt: i32,
    /// When execution started.
    pub started_at: DateTime<Utc>,
}

/// Jobs executing across all runners of a pool.
pub type InFlightJobs = Arc<DashMap<JobId, InFlightJob>>;

/// Polls one queue and executes its jobs with bounded concurrency.
#[derive(Debug)]
pub struct WorkerRunner {
    queue: Arc<JobQueue>,
    executor: Arc<JobExecutor>,
    queue_name: String,
    concurrency: usize,
    worker_id: String,
    poll_interval: Duration,
    shutdown_timeout: Duration,
    in_flight: InFlightJobs,
}

impl WorkerRunner {
    /// Create a runner for `queue_name`.
    pub fn new(
        queue: Arc<JobQueue>,
        executor: Arc<JobExecutor>,
        queue_name: impl Into<String>,
        concurrency: usize,
        worker_id: impl Into<String>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            queue,
            executor,
            queue_name: queue_name.into(),
            concurrency: concurrency.max(1),
            worker_id: worker_id.into(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_seconds),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Share an in-flight registry with other runners.
    pub fn with_in_flight(mut self, in_flight: InFlightJobs) -> Self {
        self.in_flight = in_flight;
        self
    }

    /// Run until the cancel signal is received, then wait (bounded) for
    /// in-flight jobs.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            queue = %self.queue_name,
            worker_id = %self.worker_id,
            concurrency = self.concurrency,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        loop {
            let permit = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                    continue;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self.queue.claim(&self.queue_name, &self.worker_id).await {
                Ok(Some(job)) => {
                    self.spawn_job(job, permit);
                    continue;
                }
                Ok(None) => {
                    drop(permit);
                    trace!(queue = %self.queue_name, "No jobs available");
                }
                Err(e) => {
                    drop(permit);
                    error!(queue = %self.queue_name, error = %e, "Failed to claim job");
                }
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        info!(queue = %self.queue_name, "Worker waiting for in-flight jobs to complete...");
        let drained = time::timeout(
            self.shutdown_timeout,
            semaphore.acquire_many(self.concurrency as u32),
        )
        .await;
        if drained.is_err() {
            warn!(
                queue = %self.queue_name,
                abandoned = self.in_flight.iter().filter(|e| e.queue == self.queue_name).count(),
                "Shutdown timeout reached; remaining jobs will be recovered as stalled"
            );
        }
        info!(queue = %self.queue_name, "Worker shut down complete");
    }

    fn spawn_job(&self, job: Job, permit: tokio::sync::OwnedSemaphorePermit) {
        let queue = Arc::clone(&self.queue);
        let executor = Arc::clone(&self.executor);
        let in_flight = Arc::clone(&self.in_flight);
        let worker_id = self.worker_id.clone();

        in_flight.insert(
            job.id,
            InFlightJob {
                queue: job.queue.clone(),
                job_type: job.job_type.clone(),
                attempt: job.attempts,
                started_at: Utc::now(),
            },
        );

        tokio::spawn(async move {
            let _permit = permit;
            process_job(&queue, &executor, &worker_id, &job).await;
            in_flight.remove(&job.id);
        });
    }
}

/// Execute one claimed job, renewing its lock, and settle the outcome.
async fn process_job(queue: &JobQueue, executor: &JobExecutor, worker_id: &str, job: &Job) {
    info!(
        job_id = %job.id,
        job_type = %job.job_type,
        queue = %job.queue,
        attempt = job.attempts,
        max_attempts = job.max_attempts,
        "Processing job"
    );

    let renew_every = (queue.lock_duration() / 2)
        .to_std()
        .unwrap_or(Duration::from_secs(1))
        .max(Duration::from_millis(1));
    let mut renewal = time::interval_at(time::Instant::now() + renew_every, renew_every);
    let execution = executor.execute(job);
    tokio::pin!(execution);

    let outcome = loop {
        tokio::select! {
            outcome = &mut execution => break outcome,
            _ = renewal.tick() => match queue.renew(job.id, worker_id).await {
                Ok(true) => trace!(job_id = %job.id, "Lock renewed"),
                Ok(false) => warn!(job_id = %job.id, "Lock renewal refused; job may run twice"),
                Err(e) => warn!(job_id = %job.id, error = %e, "Lock renewal failed"),
            },
        }
    };

    match outcome {
        Ok(result) => match queue.complete(job, worker_id, result.as_ref()).await {
            Ok(true) => info!(job_id = %job.id, job_type = %job.job_type, "Job completed"),
            Ok(false) => {}
            Err(e) => error!(job_id = %job.id, error = %e, "Failed to mark job as completed"),
        },
        Err(err) => {
            let settled = queue
                .fail(job, worker_id, err.message(), err.is_retryable())
                .await;
            match settled {
                Ok(FailureOutcome::Retrying { run_at }) => warn!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    error = %err,
                    retry_at = %run_at,
                    "Job failed; retry scheduled"
                ),
                Ok(FailureOutcome::Failed) => error!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    error = %err,
                    "Job failed"
                ),
                Ok(FailureOutcome::LockLost) => {}
                Err(e) => error!(job_id = %job.id, error = %e, "Failed to record job failure"),
            }
        }
    }
}

/// Runs one [`WorkerRunner`] per configured queue plus the stall sweeper.
#[derive(Debug)]
pub struct WorkerPool {
    queue: Arc<JobQueue>,
    executor: Arc<JobExecutor>,
    config: WorkerConfig,
    worker_id: String,
    in_flight: InFlightJobs,
}

impl WorkerPool {
    /// Create a pool; the worker id comes from config or is generated.
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        let worker_id = config
            .worker_id
            .clone()
            .unwrap_or_else(|| format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]));
        Self {
            queue,
            executor,
            config,
            worker_id,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Identifier stamped on claimed jobs.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Snapshot of jobs currently executing.
    pub fn in_flight(&self) -> Vec<(JobId, InFlightJob)> {
        self.in_flight
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Run every queue runner and the stall sweeper until `cancel` fires.
    pub async fn run(&self, cancel: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();

        for (queue_name, concurrency) in self.config.queues.entries() {
            let runner = WorkerRunner::new(
                Arc::clone(&self.queue),
                Arc::clone(&self.executor),
                queue_name,
                concurrency,
                self.worker_id.clone(),
                &self.config,
            )
            .with_in_flight(Arc::clone(&self.in_flight));
            let cancel = cancel.clone();
            tasks.spawn(async move { runner.run(cancel).await });
        }

        let queue = Arc::clone(&self.queue);
        let interval = Duration::from_millis(self.config.stall_check_interval_ms.max(1));
        tasks.spawn(sweep_stalled(queue, interval, cancel));

        info!(worker_id = %self.worker_id, "Worker pool started");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task panicked");
            }
        }
        info!(worker_id = %self.worker_id, "Worker pool stopped");
    }
}

/// Periodically release jobs whose lock expired.
async fn sweep_stalled(queue: Arc<JobQueue>, every: Duration, mut cancel: watch::Receiver<bool>) {
    let mut ticker = time::interval(every);
    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match queue.recover_stalled().await {
                    Ok(report) => debug!(requeued = report.requeued, failed = report.failed, "Stall sweep finished"),
                    Err(e) => error!(error = %e, "Stall sweep failed"),
                }
            }
        }
    }
}
