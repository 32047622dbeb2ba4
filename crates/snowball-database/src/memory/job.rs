//! In-memory job store.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use snowball_core::result::AppResult;
use snowball_core::types::id::JobId;
use snowball_entity::job::{Job, JobStatus};

use crate::store::{JobStore, QueueStatusCount, STALLED_FINAL_ATTEMPT, StallReport};

/// In-memory job store.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Release the lock fields of a job.
fn unlock(job: &mut Job) {
    job.locked_until = None;
    job.worker_id = None;
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &Job) -> AppResult<()> {
        self.jobs.lock().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        Ok(self.jobs.lock().await.get(&id).cloned())
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
        locked_until: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .values()
            .filter(|job| job.queue == queue && job.is_claimable_at(now))
            .max_by_key(|job| (job.priority, Reverse(job.run_at), Reverse(job.created_at)))
            .map(|job| job.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        job.status = JobStatus::Active;
        job.attempts += 1;
        job.worker_id = Some(worker_id.to_string());
        job.locked_until = Some(locked_until);
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn renew_lock(
        &self,
        id: JobId,
        worker_id: &str,
        locked_until: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&id) {
            Some(job) if job.is_locked_by(worker_id) => {
                job.locked_until = Some(locked_until);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(
        &self,
        id: JobId,
        worker_id: &str,
        result: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&id) {
            Some(job) if job.is_locked_by(worker_id) => {
                job.status = JobStatus::Completed;
                job.result = result.cloned();
                job.completed_at = Some(now);
                job.updated_at = now;
                unlock(job);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn schedule_retry(
        &self,
        id: JobId,
        worker_id: &str,
        error: &str,
        run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&id) {
            Some(job) if job.is_locked_by(worker_id) => {
                job.status = JobStatus::Delayed;
                job.error_message = Some(error.to_string());
                job.run_at = run_at;
                job.updated_at = now;
                unlock(job);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail(
        &self,
        id: JobId,
        worker_id: &str,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&id) {
            Some(job) if job.is_locked_by(worker_id) => {
                job.status = JobStatus::Failed;
                job.error_message = Some(error.to_string());
                job.completed_at = Some(now);
                job.updated_at = now;
                unlock(job);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn recover_stalled(&self, now: DateTime<Utc>) -> AppResult<StallReport> {
        let mut jobs = self.jobs.lock().await;
        let mut report = StallReport::default();
        for job in jobs.values_mut().filter(|job| job.is_stalled_at(now)) {
            if job.has_attempts_left() {
                job.status = JobStatus::Stalled;
                report.requeued += 1;
            } else {
                job.status = JobStatus::Failed;
                job.error_message = Some(STALLED_FINAL_ATTEMPT.to_string());
                job.completed_at = Some(now);
                report.failed += 1;
            }
            job.updated_at = now;
            unlock(job);
        }
        Ok(report)
    }

    async fn purge(&self, status: JobStatus, before: DateTime<Utc>) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().await;
        let initial = jobs.len();
        jobs.retain(|_, job| {
            !(job.status == status && job.completed_at.is_some_and(|at| at < before))
        });
        Ok((initial - jobs.len()) as u64)
    }

    async fn count_by_status(&self) -> AppResult<Vec<QueueStatusCount>> {
        let jobs = self.jobs.lock().await;
        let mut counts: BTreeMap<(String, &'static str), (JobStatus, i64)> = BTreeMap::new();
        for job in jobs.values() {
            counts
                .entry((job.queue.clone(), job.status.as_str()))
                .or_insert((job.status, 0))
                .1 += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((queue, _), (status, count))| QueueStatusCount {
                queue,
                status,
                count,
            })
            .collect())
    }

    async fn list_by_status(&self, status: JobStatus, limit: i64) -> AppResult<Vec<Job>> {
        let jobs = self.jobs.lock().await;
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|job| job.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn reset_failed(&self, id: JobId, now: DateTime<Utc>) -> AppResult<bool> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Failed => {
                job.status = JobStatus::Waiting;
                job.attempts = 0;
                job.run_at = now;
                job.completed_at = None;
                job.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
