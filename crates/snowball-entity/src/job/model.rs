//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use snowball_core::types::id::JobId;

use super::backoff::BackoffPolicy;
use super::payload::JobPayload;
use super::status::JobStatus;

/// A background job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Queue name.
    pub queue: String,
    /// Job type identifier (e.g., `"process-csv"`, `"verify-email"`).
    pub job_type: String,
    /// Job payload, tagged with its type.
    pub payload: serde_json::Value,
    /// Attempts started so far (incremented on claim).
    pub attempts: i32,
    /// Maximum allowed attempts.
    pub max_attempts: i32,
    /// Retry delay schedule.
    #[sqlx(flatten)]
    pub backoff: BackoffPolicy,
    /// Higher values are claimed first.
    pub priority: i32,
    /// Initial delay requested at enqueue time.
    pub delay_ms: i64,
    /// Current job status.
    pub status: JobStatus,
    /// Earliest time the job may be claimed.
    pub run_at: DateTime<Utc>,
    /// Lock expiry while active.
    pub locked_until: Option<DateTime<Utc>>,
    /// Worker holding the lock.
    pub worker_id: Option<String>,
    /// Handler result on completion.
    pub result: Option<serde_json::Value>,
    /// Last error message.
    pub error_message: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a waiting (or delayed) job from enqueue parameters.
    pub fn from_new(new: NewJob, now: DateTime<Utc>) -> Self {
        let delay_ms = new.delay_ms.max(0);
        let status = if delay_ms > 0 {
            JobStatus::Delayed
        } else {
            JobStatus::Waiting
        };
        Self {
            id: JobId::new(),
            queue: new.queue,
            job_type: new.job_type,
            payload: new.payload,
            attempts: 0,
            max_attempts: new.max_attempts.max(1),
            backoff: new.backoff,
            priority: new.priority,
            delay_ms,
            status,
            run_at: now + chrono::Duration::milliseconds(delay_ms),
            locked_until: None,
            worker_id: None,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Check if another attempt is allowed after the current one fails.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Check if `worker_id` currently owns the job lock.
    pub fn is_locked_by(&self, worker_id: &str) -> bool {
        self.status == JobStatus::Active && self.worker_id.as_deref() == Some(worker_id)
    }

    /// Check if a worker may claim the job at `now`.
    pub fn is_claimable_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_claimable() && self.run_at <= now
    }

    /// Check if the job lock expired at `now` while active.
    pub fn is_stalled_at(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Active && self.locked_until.is_some_and(|until| until < now)
    }

    /// Decode the typed payload.
    pub fn decode_payload(&self) -> Result<JobPayload, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Queue name.
    pub queue: String,
    /// Job type identifier.
    pub job_type: String,
    /// Job-specific payload.
    pub payload: serde_json::Value,
    /// Maximum attempts.
    pub max_attempts: i32,
    /// Retry schedule.
    pub backoff: BackoffPolicy,
    /// Claim priority (higher first).
    pub priority: i32,
    /// Initial delay in milliseconds.
    pub delay_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(delay_ms: i64) -> NewJob {
        NewJob {
            queue: "data-cleanup".to_string(),
            job_type: "cleanup".to_string(),
            payload: serde_json::json!({"type": "cleanup"}),
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
            priority: 0,
            delay_ms,
        }
    }

    #[test]
    fn test_immediate_job_is_waiting() {
        let now = Utc::now();
        let job = Job::from_new(new_job(0), now);
        assert_eq!(job.status, JobStatus::Waiting);
        assert!(job.is_claimable_at(now));
    }

    #[test]
    fn test_delayed_job_not_claimable_early() {
        let now = Utc::now();
        let job = Job::from_new(new_job(5_000), now);
        assert_eq!(job.status, JobStatus::Delayed);
        assert!(!job.is_claimable_at(now));
        assert!(job.is_claimable_at(now + chrono::Duration::seconds(6)));
    }

    #[test]
    fn test_stall_detection() {
        let now = Utc::now();
        let mut job = Job::from_new(new_job(0), now);
        job.status = JobStatus::Active;
        job.locked_until = Some(now);
        assert!(!job.is_stalled_at(now));
        assert!(job.is_stalled_at(now + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_decode_payload() {
        let job = Job::from_new(new_job(0), Utc::now());
        assert!(matches!(job.decode_payload().unwrap(), JobPayload::Cleanup));
    }
}
