//! PostgreSQL member email store.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use snowball_core::error::{AppError, ErrorKind};
use snowball_core::result::AppResult;
use snowball_core::types::id::{JobId, RepositoryId, UserId};
use snowball_entity::email::{EmailEntry, VerificationStatus};
use snowball_entity::network::ContributorStat;

use crate::store::EmailStore;

/// Member store backed by `email_entries`.
#[derive(Debug, Clone)]
pub struct PgEmailStore {
    pool: PgPool,
}

impl PgEmailStore {
    /// Create a new member store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailStore for PgEmailStore {
    async fn insert_if_absent(&self, entry: &EmailEntry) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO email_entries (address, repository_id, name, source, tags, \
             quality_score, verification_status, snowball_depth, contributor_id, wave_id, \
             added_at, verified_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (address, repository_id) DO NOTHING",
        )
        .bind(&entry.address)
        .bind(entry.repository_id)
        .bind(&entry.name)
        .bind(&entry.source)
        .bind(&entry.tags)
        .bind(entry.quality_score)
        .bind(entry.verification_status)
        .bind(entry.snowball_depth)
        .bind(entry.contributor_id)
        .bind(entry.wave_id)
        .bind(entry.added_at)
        .bind(entry.verified_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert email", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn find(
        &self,
        repository_id: RepositoryId,
        address: &str,
    ) -> AppResult<Option<EmailEntry>> {
        sqlx::query_as::<_, EmailEntry>(
            "SELECT * FROM email_entries WHERE repository_id = $1 AND address = $2",
        )
        .bind(repository_id)
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find email", e))
    }

    async fn existing_addresses(
        &self,
        repository_id: RepositoryId,
        addresses: &[String],
    ) -> AppResult<HashSet<String>> {
        if addresses.is_empty() {
            return Ok(HashSet::new());
        }
        let found: Vec<String> = sqlx::query_scalar(
            "SELECT address FROM email_entries \
             WHERE repository_id = $1 AND address = ANY($2)",
        )
        .bind(repository_id)
        .bind(addresses)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check existing emails", e)
        })?;
        Ok(found.into_iter().collect())
    }

    async fn list_by_wave(
        &self,
        repository_id: RepositoryId,
        wave_id: JobId,
    ) -> AppResult<Vec<EmailEntry>> {
        sqlx::query_as::<_, EmailEntry>(
            "SELECT * FROM email_entries WHERE repository_id = $1 AND wave_id = $2",
        )
        .bind(repository_id)
        .bind(wave_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list wave emails", e))
    }

    async fn list_by_repository(&self, repository_id: RepositoryId) -> AppResult<Vec<EmailEntry>> {
        sqlx::query_as::<_, EmailEntry>(
            "SELECT * FROM email_entries WHERE repository_id = $1 ORDER BY added_at ASC",
        )
        .bind(repository_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list emails", e))
    }

    async fn set_verification(
        &self,
        repository_id: RepositoryId,
        address: &str,
        status: VerificationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE email_entries SET verification_status = $3, verified_at = $4 \
             WHERE repository_id = $1 AND address = $2",
        )
        .bind(repository_id)
        .bind(address)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update verification", e)
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn top_contributors(
        &self,
        repository_id: RepositoryId,
        limit: i64,
    ) -> AppResult<Vec<ContributorStat>> {
        let rows: Vec<(UserId, i64)> = sqlx::query_as(
            "SELECT contributor_id, COUNT(*) AS emails_contributed FROM email_entries \
             WHERE repository_id = $1 AND contributor_id IS NOT NULL \
             GROUP BY contributor_id \
             ORDER BY emails_contributed DESC, contributor_id ASC \
             LIMIT $2",
        )
        .bind(repository_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rank contributors", e)
        })?;
        Ok(rows
            .into_iter()
            .map(|(user_id, emails_contributed)| ContributorStat {
                user_id,
                emails_contributed,
            })
            .collect())
    }

    async fn average_quality(
        &self,
        repository_id: RepositoryId,
        status: VerificationStatus,
    ) -> AppResult<f64> {
        sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(AVG(quality_score), 0)::float8 FROM email_entries \
             WHERE repository_id = $1 AND verification_status = $2",
        )
        .bind(repository_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to average quality", e))
    }
}
