//! `cleanup`: purge old terminal jobs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::{Value, json};
use tracing::info;

use snowball_entity::job::{Job, JobPayload, JobStatus};

use crate::executor::{JobExecutionError, JobHandler, unexpected_payload};
use crate::queue::JobQueue;

/// Purges completed jobs past the grace period and, when configured,
/// failed jobs past their retention.
#[derive(Debug)]
pub struct CleanupJobHandler {
    queue: Arc<JobQueue>,
    completed_retention: Duration,
    failed_retention: Option<Duration>,
}

impl CleanupJobHandler {
    /// Create a new cleanup handler
    pub fn new(
        queue: Arc<JobQueue>,
        completed_retention: Duration,
        failed_retention: Option<Duration>,
    ) -> Self {
        Self {
            queue,
            completed_retention,
            failed_retention,
        }
    }
}

#[async_trait]
impl JobHandler for CleanupJobHandler {
    fn job_type(&self) -> &'static str {
        "cleanup"
    }

    async fn execute(&self, _job: &Job, payload: JobPayload) -> Result<Option<Value>, JobExecutionError> {
        if payload != JobPayload::Cleanup {
            return Err(unexpected_payload(self.job_type(), &payload));
        }

        let completed = self
            .queue
            .purge(JobStatus::Completed, self.completed_retention)
            .await?;
        let failed = match self.failed_retention {
            Some(retention) => self.queue.purge(JobStatus::Failed, retention).await?,
            None => 0,
        };

        info!(completed, failed, "Job cleanup finished");
        Ok(Some(json!({
            "completedRemoved": completed,
            "failedRemoved": failed,
        })))
    }
}

#[cfg(test)]
mod tests {
    use snowball_core::config::WorkerConfig;
    use snowball_database::DataStore;

    use super::*;
    use crate::queue::JobOptions;

    const WORKER: &str = "w";

    async fn settle(queue: &JobQueue, succeed: bool) -> Job {
        queue
            .enqueue("data-cleanup", &JobPayload::Cleanup, JobOptions::default())
            .await
            .unwrap();
        let job = queue.claim("data-cleanup", WORKER).await.unwrap().unwrap();
        if succeed {
            queue.complete(&job, WORKER, None).await.unwrap();
        } else {
            queue.fail(&job, WORKER, "bad", false).await.unwrap();
        }
        job
    }

    #[tokio::test]
    async fn test_purges_completed_keeps_failed() {
        let queue = Arc::new(JobQueue::new(DataStore::memory().jobs, &WorkerConfig::default(), 3));
        let done = settle(&queue, true).await;
        let failed = settle(&queue, false).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let handler = CleanupJobHandler::new(queue.clone(), Duration::milliseconds(5), None);
        let result = handler.execute(&done, JobPayload::Cleanup).await.unwrap().unwrap();
        assert_eq!(result["completedRemoved"], 1);
        assert_eq!(result["failedRemoved"], 0);
        assert!(queue.get(done.id).await.unwrap().is_none());
        assert!(queue.get(failed.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_retention_applies_when_set() {
        let queue = Arc::new(JobQueue::new(DataStore::memory().jobs, &WorkerConfig::default(), 3));
        let failed = settle(&queue, false).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let handler = CleanupJobHandler::new(
            queue.clone(),
            Duration::hours(24),
            Some(Duration::milliseconds(5)),
        );
        let result = handler.execute(&failed, JobPayload::Cleanup).await.unwrap().unwrap();
        assert_eq!(result["failedRemoved"], 1);
    }
}
