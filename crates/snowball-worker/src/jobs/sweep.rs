//! `snowball-sweep`: start depth-0 waves for pending contact lists.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use snowball_database::UserStore;
use snowball_entity::job::{Job, JobPayload, ProcessCsvPayload};

use crate::executor::{JobExecutionError, JobHandler, unexpected_payload};
use crate::queue::{JobOptions, JobQueue};

/// Lists read from the store per batch.
const SWEEP_BATCH: i64 = 100;

/// Enqueues a `process-csv` job for every contact list that has a target
/// repository and was never queued.
#[derive(Debug)]
pub struct SnowballSweepJobHandler {
    users: Arc<dyn UserStore>,
    queue: Arc<JobQueue>,
}

impl SnowballSweepJobHandler {
    /// Create a new handler.
    pub fn new(users: Arc<dyn UserStore>, queue: Arc<JobQueue>) -> Self {
        Self { users, queue }
    }
}

#[async_trait]
impl JobHandler for SnowballSweepJobHandler {
    fn job_type(&self) -> &'static str {
        "snowball-sweep"
    }

    async fn execute(&self, _job: &Job, payload: JobPayload) -> Result<Option<Value>, JobExecutionError> {
        if payload != JobPayload::SnowballSweep {
            return Err(unexpected_payload(self.job_type(), &payload));
        }

        let mut enqueued = 0usize;
        loop {
            let batch = self.users.pending_contact_lists(SWEEP_BATCH).await?;
            let exhausted = (batch.len() as i64) < SWEEP_BATCH;
            for list in batch {
                let Some(repository_id) = list.repository_id else {
                    continue;
                };
                // Only the sweep that marks a list enqueues it.
                if !self.users.mark_contact_list_queued(list.id, Utc::now()).await? {
                    debug!(contact_list_id = %list.id, "Contact list already queued");
                    continue;
                }
                let wave = JobPayload::ProcessCsv(ProcessCsvPayload {
                    repository_id,
                    csv_payload: list.csv_payload,
                    user_id: list.user_id,
                    depth: 0,
                    source: None,
                    contact_list_id: Some(list.id),
                });
                if let Err(e) = self.queue.enqueue_payload(&wave, JobOptions::default()).await {
                    // Unmark so the retried sweep picks the list up again.
                    if let Err(clear) = self.users.clear_contact_list_queued(list.id).await {
                        warn!(contact_list_id = %list.id, error = %clear, "Failed to unmark contact list");
                    }
                    return Err(e.into());
                }
                enqueued += 1;
            }
            if exhausted {
                break;
            }
        }

        info!(enqueued, "Snowball sweep finished");
        Ok(Some(json!({ "enqueued": enqueued })))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::DateTime;
    use snowball_core::AppError;
    use snowball_core::config::WorkerConfig;
    use snowball_core::result::AppResult;
    use snowball_core::types::id::{JobId, RepositoryId, UserId};
    use snowball_database::{DataStore, JobStore, QueueStatusCount, StallReport};
    use snowball_entity::job::JobStatus;
    use snowball_entity::user::ContactList;

    use super::*;

    /// Job store that rejects the first `process-csv` insert.
    #[derive(Debug)]
    struct RejectFirstWave {
        inner: Arc<dyn JobStore>,
        rejected: AtomicBool,
    }

    #[async_trait]
    impl JobStore for RejectFirstWave {
        async fn insert(&self, job: &Job) -> AppResult<()> {
            if job.job_type == "process-csv" && !self.rejected.swap(true, Ordering::SeqCst) {
                return Err(AppError::database("connection reset"));
            }
            self.inner.insert(job).await
        }

        async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
            self.inner.find_by_id(id).await
        }

        async fn claim_next(
            &self,
            queue: &str,
            worker_id: &str,
            now: DateTime<Utc>,
            locked_until: DateTime<Utc>,
        ) -> AppResult<Option<Job>> {
            self.inner.claim_next(queue, worker_id, now, locked_until).await
        }

        async fn renew_lock(
            &self,
            id: JobId,
            worker_id: &str,
            locked_until: DateTime<Utc>,
        ) -> AppResult<bool> {
            self.inner.renew_lock(id, worker_id, locked_until).await
        }

        async fn complete(
            &self,
            id: JobId,
            worker_id: &str,
            result: Option<&Value>,
            now: DateTime<Utc>,
        ) -> AppResult<bool> {
            self.inner.complete(id, worker_id, result, now).await
        }

        async fn schedule_retry(
            &self,
            id: JobId,
            worker_id: &str,
            error: &str,
            run_at: DateTime<Utc>,
            now: DateTime<Utc>,
        ) -> AppResult<bool> {
            self.inner.schedule_retry(id, worker_id, error, run_at, now).await
        }

        async fn fail(
            &self,
            id: JobId,
            worker_id: &str,
            error: &str,
            now: DateTime<Utc>,
        ) -> AppResult<bool> {
            self.inner.fail(id, worker_id, error, now).await
        }

        async fn recover_stalled(&self, now: DateTime<Utc>) -> AppResult<StallReport> {
            self.inner.recover_stalled(now).await
        }

        async fn purge(&self, status: JobStatus, before: DateTime<Utc>) -> AppResult<u64> {
            self.inner.purge(status, before).await
        }

        async fn count_by_status(&self) -> AppResult<Vec<QueueStatusCount>> {
            self.inner.count_by_status().await
        }

        async fn list_by_status(&self, status: JobStatus, limit: i64) -> AppResult<Vec<Job>> {
            self.inner.list_by_status(status, limit).await
        }

        async fn reset_failed(&self, id: JobId, now: DateTime<Utc>) -> AppResult<bool> {
            self.inner.reset_failed(id, now).await
        }
    }

    #[tokio::test]
    async fn test_failed_enqueue_leaves_list_pending() {
        let store = DataStore::memory();
        let list = ContactList::new(
            UserId::new(),
            Some(RepositoryId::new()),
            "a.csv",
            "email\nx@y.org\n",
            Utc::now(),
        );
        store.users.insert_contact_list(&list).await.unwrap();

        let jobs = Arc::new(RejectFirstWave {
            inner: store.jobs.clone(),
            rejected: AtomicBool::new(false),
        });
        let queue = Arc::new(JobQueue::new(jobs, &WorkerConfig::default(), 3));
        let handler = SnowballSweepJobHandler::new(store.users.clone(), queue.clone());
        let job = queue
            .enqueue_payload(&JobPayload::SnowballSweep, JobOptions::default())
            .await
            .unwrap();

        let err = handler.execute(&job, JobPayload::SnowballSweep).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.users.pending_contact_lists(10).await.unwrap().len(), 1);

        let retried = handler.execute(&job, JobPayload::SnowballSweep).await.unwrap().unwrap();
        assert_eq!(retried["enqueued"], 1);
        assert!(store.users.pending_contact_lists(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_queues_each_list_once() {
        let store = DataStore::memory();
        let user = UserId::new();
        let repo = RepositoryId::new();
        for name in ["a.csv", "b.csv"] {
            store
                .users
                .insert_contact_list(&ContactList::new(user, Some(repo), name, "email\nx@y.org\n", Utc::now()))
                .await
                .unwrap();
        }
        store
            .users
            .insert_contact_list(&ContactList::new(user, None, "untargeted.csv", "email\n", Utc::now()))
            .await
            .unwrap();

        let queue = Arc::new(JobQueue::new(store.jobs.clone(), &WorkerConfig::default(), 3));
        let handler = SnowballSweepJobHandler::new(store.users.clone(), queue.clone());
        let job = queue
            .enqueue_payload(&JobPayload::SnowballSweep, JobOptions::default())
            .await
            .unwrap();

        let first = handler.execute(&job, JobPayload::SnowballSweep).await.unwrap().unwrap();
        assert_eq!(first["enqueued"], 2);
        let second = handler.execute(&job, JobPayload::SnowballSweep).await.unwrap().unwrap();
        assert_eq!(second["enqueued"], 0);

        let waves: Vec<Job> = store
            .jobs
            .list_by_status(JobStatus::Waiting, 10)
            .await
            .unwrap()
            .into_iter()
            .filter(|j| j.job_type == "process-csv")
            .collect();
        assert_eq!(waves.len(), 2);
        assert!(waves.iter().all(|j| j.queue == "email-processing"));
    }
}
