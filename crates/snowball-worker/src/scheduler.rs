//! Cron scheduler for recurring jobs.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use snowball_core::config::SchedulerConfig;
use snowball_core::error::AppError;
use snowball_entity::job::JobPayload;
use snowball_entity::user::DigestFrequency;

use crate::queue::{JobOptions, JobQueue};

/// Cron-based scheduler that enqueues fixed payloads on a schedule
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Job queue for enqueuing scheduled work
    queue: Arc<JobQueue>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

/// The built-in recurring jobs described by `config`.
pub fn default_schedules(config: &SchedulerConfig) -> Vec<(&'static str, String, JobPayload)> {
    vec![
        ("cleanup", config.cleanup_cron.clone(), JobPayload::Cleanup),
        (
            "daily-digests",
            config.daily_digest_cron.clone(),
            JobPayload::DispatchDigests {
                frequency: DigestFrequency::Daily,
            },
        ),
        (
            "weekly-digests",
            config.weekly_digest_cron.clone(),
            JobPayload::DispatchDigests {
                frequency: DigestFrequency::Weekly,
            },
        ),
        (
            "snowball-sweep",
            config.snowball_sweep_cron.clone(),
            JobPayload::SnowballSweep,
        ),
    ]
}

/// Enqueue one scheduled payload. Failures are logged so the next tick
/// still fires.
pub async fn enqueue_scheduled(queue: &JobQueue, name: &str, payload: &JobPayload) -> bool {
    debug!(schedule = name, "Scheduling recurring job");
    match queue.enqueue_payload(payload, JobOptions::default()).await {
        Ok(job) => {
            debug!(schedule = name, job_id = %job.id, "Recurring job enqueued");
            true
        }
        Err(e) => {
            error!(schedule = name, error = %e, "Failed to enqueue recurring job");
            false
        }
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<JobQueue>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, queue })
    }

    /// Register all built-in recurring jobs
    pub async fn register_default_tasks(&self, config: &SchedulerConfig) -> Result<(), AppError> {
        for (name, cron, payload) in default_schedules(config) {
            self.register(name, &cron, payload).await?;
        }
        info!("All scheduled tasks registered");
        Ok(())
    }

    /// Register a recurring payload under a six-field cron expression
    pub async fn register(
        &self,
        name: &'static str,
        cron: &str,
        payload: JobPayload,
    ) -> Result<(), AppError> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            let payload = payload.clone();
            Box::pin(async move {
                enqueue_scheduled(&queue, name, &payload).await;
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid cron expression '{cron}' for {name}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        info!(schedule = name, cron, "Registered recurring job");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Cron scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use snowball_core::config::WorkerConfig;
    use snowball_core::error::ErrorKind;
    use snowball_core::types::queue;
    use snowball_database::DataStore;
    use snowball_entity::job::JobStatus;

    use super::*;

    fn job_queue() -> Arc<JobQueue> {
        Arc::new(JobQueue::new(DataStore::memory().jobs, &WorkerConfig::default(), 3))
    }

    #[test]
    fn test_default_schedules_route_to_queues() {
        let schedules = default_schedules(&SchedulerConfig::default());
        let queues: Vec<&str> = schedules.iter().map(|(_, _, p)| p.default_queue()).collect();
        assert_eq!(
            queues,
            vec![
                queue::DATA_CLEANUP,
                queue::DIGEST_GENERATION,
                queue::DIGEST_GENERATION,
                queue::SNOWBALL_DISTRIBUTION,
            ]
        );
    }

    #[tokio::test]
    async fn test_enqueue_scheduled() {
        let queue = job_queue();
        assert!(enqueue_scheduled(&queue, "cleanup", &JobPayload::Cleanup).await);
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].queue, queue::DATA_CLEANUP);
        assert_eq!(stats[0].status, JobStatus::Waiting);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_register_defaults() {
        let scheduler = CronScheduler::new(job_queue()).await.unwrap();
        scheduler
            .register_default_tasks(&SchedulerConfig::default())
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_cron_rejected() {
        let scheduler = CronScheduler::new(job_queue()).await.unwrap();
        let err = scheduler
            .register("cleanup", "every tuesday-ish", JobPayload::Cleanup)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
