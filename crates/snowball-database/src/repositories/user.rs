//! PostgreSQL user and contact list store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use snowball_core::error::{AppError, ErrorKind};
use snowball_core::result::AppResult;
use snowball_core::types::id::{ContactListId, UserId};
use snowball_entity::user::{ContactList, DigestFrequency, User};

use crate::store::UserStore;

/// User store backed by `users` and `contact_lists`.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, display_name, karma, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.karma)
        .bind(Json(&user.metadata))
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert user", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by email", e)
            })
    }

    async fn list_by_digest_frequency(&self, frequency: DigestFrequency) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE metadata->>'digest_frequency' = $1 \
             ORDER BY created_at ASC",
        )
        .bind(frequency.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list digest users", e))
    }

    async fn insert_contact_list(&self, list: &ContactList) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO contact_lists (id, user_id, repository_id, name, csv_payload, \
             uploaded_at, queued_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(list.id)
        .bind(list.user_id)
        .bind(list.repository_id)
        .bind(&list.name)
        .bind(&list.csv_payload)
        .bind(list.uploaded_at)
        .bind(list.queued_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert contact list", e)
        })?;
        Ok(())
    }

    async fn contact_lists_for(&self, user_id: UserId) -> AppResult<Vec<ContactList>> {
        sqlx::query_as::<_, ContactList>(
            "SELECT * FROM contact_lists WHERE user_id = $1 ORDER BY uploaded_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list contact lists", e))
    }

    async fn pending_contact_lists(&self, limit: i64) -> AppResult<Vec<ContactList>> {
        sqlx::query_as::<_, ContactList>(
            "SELECT * FROM contact_lists \
             WHERE repository_id IS NOT NULL AND queued_at IS NULL \
             ORDER BY uploaded_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list pending contact lists", e)
        })
    }

    async fn mark_contact_list_queued(
        &self,
        id: ContactListId,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE contact_lists SET queued_at = $2 WHERE id = $1 AND queued_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark contact list queued", e)
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_contact_list_queued(&self, id: ContactListId) -> AppResult<()> {
        sqlx::query("UPDATE contact_lists SET queued_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to clear contact list mark", e)
            })?;
        Ok(())
    }
}
