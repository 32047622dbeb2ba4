//! PostgreSQL repository store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use snowball_core::error::{AppError, ErrorKind};
use snowball_core::result::AppResult;
use snowball_core::types::id::{JobId, RepositoryId, UserId};
use snowball_entity::repository::{GrowthRecord, Repository};

use crate::store::RepositoryStore;

/// Repository store backed by `repositories` and `growth_history`.
#[derive(Debug, Clone)]
pub struct PgRepositoryStore {
    pool: PgPool,
}

impl PgRepositoryStore {
    /// Create a new repository store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn history(&self, id: RepositoryId) -> AppResult<Vec<GrowthRecord>> {
        sqlx::query_as::<_, GrowthRecord>(
            "SELECT date, count_added, total, wave_id FROM growth_history \
             WHERE repository_id = $1 ORDER BY date ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load growth history", e))
    }
}

#[async_trait]
impl RepositoryStore for PgRepositoryStore {
    async fn insert(&self, repository: &Repository) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO repositories (id, owner_id, name, trusted_domains, blocked_domains, \
             blacklist, email_count, growth_rate, max_emails, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(repository.id)
        .bind(repository.owner_id)
        .bind(&repository.name)
        .bind(&repository.trusted_domains)
        .bind(&repository.blocked_domains)
        .bind(&repository.blacklist)
        .bind(repository.email_count)
        .bind(repository.growth_rate)
        .bind(repository.limits.max_emails)
        .bind(repository.created_at)
        .bind(repository.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert repository", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: RepositoryId) -> AppResult<Option<Repository>> {
        let repository = sqlx::query_as::<_, Repository>("SELECT * FROM repositories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find repository", e)
            })?;

        match repository {
            Some(mut repository) => {
                repository.growth_history = self.history(id).await?;
                Ok(Some(repository))
            }
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Repository>> {
        sqlx::query_as::<_, Repository>(
            "SELECT * FROM repositories WHERE owner_id = $1 ORDER BY created_at ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list repositories", e))
    }

    async fn record_growth(
        &self,
        id: RepositoryId,
        wave_id: Option<JobId>,
        added: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Option<GrowthRecord>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        if let Some(wave_id) = wave_id {
            let recorded: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM growth_history WHERE repository_id = $1 AND wave_id = $2",
            )
            .bind(id)
            .bind(wave_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to check growth record", e)
            })?;
            if recorded.is_some() {
                return Ok(None);
            }
        }

        let total: Option<i64> = sqlx::query_scalar(
            "UPDATE repositories SET email_count = email_count + $2, updated_at = $3 \
             WHERE id = $1 RETURNING email_count",
        )
        .bind(id)
        .bind(added)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update email count", e))?;

        let total =
            total.ok_or_else(|| AppError::not_found(format!("Repository {id} not found")))?;

        let record = sqlx::query_as::<_, GrowthRecord>(
            "INSERT INTO growth_history (repository_id, date, count_added, total, wave_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING date, count_added, total, wave_id",
        )
        .bind(id)
        .bind(now)
        .bind(added)
        .bind(total)
        .bind(wave_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record growth", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit growth record", e)
        })?;
        Ok(Some(record))
    }

    async fn update_growth_rate(
        &self,
        id: RepositoryId,
        growth_rate: f64,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE repositories SET growth_rate = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(growth_rate)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update growth rate", e)
                })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Repository {id} not found")));
        }
        Ok(())
    }

    async fn growth_since(
        &self,
        id: RepositoryId,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<GrowthRecord>> {
        sqlx::query_as::<_, GrowthRecord>(
            "SELECT date, count_added, total, wave_id FROM growth_history \
             WHERE repository_id = $1 AND date >= $2 ORDER BY date ASC, id ASC",
        )
        .bind(id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load growth history", e))
    }
}
