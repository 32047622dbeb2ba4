//! PostgreSQL job store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use snowball_core::error::{AppError, ErrorKind};
use snowball_core::result::AppResult;
use snowball_core::types::id::JobId;
use snowball_entity::job::{Job, JobStatus};

use crate::store::{JobStore, QueueStatusCount, STALLED_FINAL_ATTEMPT, StallReport};

/// Job store backed by the `jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a new job store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &Job) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO jobs (id, queue, job_type, payload, attempts, max_attempts, \
             backoff_kind, backoff_delay_ms, priority, delay_ms, status, run_at, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(job.id)
        .bind(&job.queue)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(job.backoff.kind)
        .bind(job.backoff.delay_ms)
        .bind(job.priority)
        .bind(job.delay_ms)
        .bind(job.status)
        .bind(job.run_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert job", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
        locked_until: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'active', attempts = attempts + 1, worker_id = $2, \
             locked_until = $4, updated_at = $3 \
             WHERE id = ( \
                SELECT id FROM jobs \
                WHERE queue = $1 AND status IN ('waiting', 'delayed', 'stalled') \
                AND run_at <= $3 \
                ORDER BY priority DESC, run_at ASC, created_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) RETURNING *",
        )
        .bind(queue)
        .bind(worker_id)
        .bind(now)
        .bind(locked_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    async fn renew_lock(
        &self,
        id: JobId,
        worker_id: &str,
        locked_until: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET locked_until = $3 \
             WHERE id = $1 AND worker_id = $2 AND status = 'active'",
        )
        .bind(id)
        .bind(worker_id)
        .bind(locked_until)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to renew job lock", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete(
        &self,
        id: JobId,
        worker_id: &str,
        result: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let updated = sqlx::query(
            "UPDATE jobs SET status = 'completed', result = $3, completed_at = $4, \
             updated_at = $4, worker_id = NULL, locked_until = NULL \
             WHERE id = $1 AND worker_id = $2 AND status = 'active'",
        )
        .bind(id)
        .bind(worker_id)
        .bind(result)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;
        Ok(updated.rows_affected() == 1)
    }

    async fn schedule_retry(
        &self,
        id: JobId,
        worker_id: &str,
        error: &str,
        run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'delayed', error_message = $3, run_at = $4, \
             updated_at = $5, worker_id = NULL, locked_until = NULL \
             WHERE id = $1 AND worker_id = $2 AND status = 'active'",
        )
        .bind(id)
        .bind(worker_id)
        .bind(error)
        .bind(run_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to schedule retry", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn fail(
        &self,
        id: JobId,
        worker_id: &str,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $3, completed_at = $4, \
             updated_at = $4, worker_id = NULL, locked_until = NULL \
             WHERE id = $1 AND worker_id = $2 AND status = 'active'",
        )
        .bind(id)
        .bind(worker_id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e)
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn recover_stalled(&self, now: DateTime<Utc>) -> AppResult<StallReport> {
        sqlx::query_as::<_, StallReport>(
            "WITH released AS ( \
                UPDATE jobs SET \
                    status = CASE WHEN attempts >= max_attempts \
                        THEN 'failed'::job_status ELSE 'stalled'::job_status END, \
                    error_message = CASE WHEN attempts >= max_attempts \
                        THEN $2 ELSE error_message END, \
                    completed_at = CASE WHEN attempts >= max_attempts \
                        THEN $1 ELSE completed_at END, \
                    worker_id = NULL, locked_until = NULL, updated_at = $1 \
                WHERE status = 'active' AND locked_until < $1 \
                RETURNING status \
             ) \
             SELECT COUNT(*) FILTER (WHERE status = 'stalled') AS requeued, \
                    COUNT(*) FILTER (WHERE status = 'failed') AS failed \
             FROM released",
        )
        .bind(now)
        .bind(STALLED_FINAL_ATTEMPT)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to recover stalled jobs", e)
        })
    }

    async fn purge(&self, status: JobStatus, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM jobs WHERE status = $1 AND completed_at < $2")
            .bind(status)
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to purge jobs", e))?;
        Ok(result.rows_affected())
    }

    async fn count_by_status(&self) -> AppResult<Vec<QueueStatusCount>> {
        sqlx::query_as::<_, QueueStatusCount>(
            "SELECT queue, status, COUNT(*) AS count FROM jobs \
             GROUP BY queue, status ORDER BY queue, status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }

    async fn list_by_status(&self, status: JobStatus, limit: i64) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE status = $1 ORDER BY updated_at DESC LIMIT $2",
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))
    }

    async fn reset_failed(&self, id: JobId, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'waiting', attempts = 0, run_at = $2, \
             completed_at = NULL, updated_at = $2 \
             WHERE id = $1 AND status = 'failed'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to retry job", e))?;
        Ok(result.rows_affected() == 1)
    }
}
