//! Data store traits and the backend bundle handed to services.
//!
//! Every trait has two implementations: an in-memory one under
//! [`crate::memory`] and a PostgreSQL one under [`crate::repositories`].
//! Methods that change a job's lock state take the claiming worker's id and
//! report whether the change was applied, so a worker that lost its lock
//! can never overwrite the new owner's outcome.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;

use snowball_core::config::AppConfig;
use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::types::id::{ContactListId, JobId, RepositoryId, UserId};
use snowball_entity::email::{EmailEntry, VerificationStatus};
use snowball_entity::job::{Job, JobStatus};
use snowball_entity::network::ContributorStat;
use snowball_entity::repository::{GrowthRecord, Repository};
use snowball_entity::user::{ContactList, DigestFrequency, User};

use crate::connection::connect;
use crate::memory::{MemoryEmailStore, MemoryJobStore, MemoryRepositoryStore, MemoryUserStore};
use crate::migration::run_migrations;
use crate::repositories::{PgEmailStore, PgJobStore, PgRepositoryStore, PgUserStore};

/// Number of jobs in one status of one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct QueueStatusCount {
    /// Queue name.
    pub queue: String,
    /// Job status.
    pub status: JobStatus,
    /// Number of jobs.
    pub count: i64,
}

/// Outcome of one stall sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StallReport {
    /// Jobs moved back to `stalled` for another attempt.
    pub requeued: i64,
    /// Jobs failed because their last attempt stalled.
    pub failed: i64,
}

/// Error message recorded on a job whose final attempt stalled.
pub const STALLED_FINAL_ATTEMPT: &str = "job stalled after final attempt";

/// Durable job storage.
#[async_trait]
pub trait JobStore: Send + Sync + fmt::Debug + 'static {
    /// Persist a new job.
    async fn insert(&self, job: &Job) -> AppResult<()>;

    /// Find a job by ID.
    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>>;

    /// Claim the next eligible job of `queue` for `worker_id`.
    ///
    /// Eligible jobs are `waiting`, `delayed` or `stalled` with `run_at <= now`,
    /// ordered by priority (highest first), then `run_at`, then `created_at`.
    /// The claimed job becomes `active` with its attempt counter incremented.
    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
        locked_until: DateTime<Utc>,
    ) -> AppResult<Option<Job>>;

    /// Extend the lock of an active job owned by `worker_id`.
    async fn renew_lock(
        &self,
        id: JobId,
        worker_id: &str,
        locked_until: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Mark a job owned by `worker_id` completed.
    async fn complete(
        &self,
        id: JobId,
        worker_id: &str,
        result: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Move a job owned by `worker_id` to `delayed` until `run_at`.
    async fn schedule_retry(
        &self,
        id: JobId,
        worker_id: &str,
        error: &str,
        run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Mark a job owned by `worker_id` failed, retaining `error`.
    async fn fail(
        &self,
        id: JobId,
        worker_id: &str,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Release active jobs whose lock expired before `now`.
    async fn recover_stalled(&self, now: DateTime<Utc>) -> AppResult<StallReport>;

    /// Delete jobs in `status` that reached it before `before`.
    async fn purge(&self, status: JobStatus, before: DateTime<Utc>) -> AppResult<u64>;

    /// Count jobs grouped by queue and status.
    async fn count_by_status(&self) -> AppResult<Vec<QueueStatusCount>>;

    /// List jobs in `status`, most recently updated first.
    async fn list_by_status(&self, status: JobStatus, limit: i64) -> AppResult<Vec<Job>>;

    /// Reset a failed job to `waiting` with zero attempts.
    async fn reset_failed(&self, id: JobId, now: DateTime<Utc>) -> AppResult<bool>;
}

/// Repository storage and growth log.
#[async_trait]
pub trait RepositoryStore: Send + Sync + fmt::Debug + 'static {
    /// Persist a new repository.
    async fn insert(&self, repository: &Repository) -> AppResult<()>;

    /// Find a repository by ID, growth history included.
    async fn find_by_id(&self, id: RepositoryId) -> AppResult<Option<Repository>>;

    /// List repositories owned by a user.
    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Repository>>;

    /// Atomically add `added` to the email count and append a growth record.
    ///
    /// Returns `None`, changing nothing, when `wave_id` already has a record.
    async fn record_growth(
        &self,
        id: RepositoryId,
        wave_id: Option<JobId>,
        added: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Option<GrowthRecord>>;

    /// Store a recomputed growth rate.
    async fn update_growth_rate(
        &self,
        id: RepositoryId,
        growth_rate: f64,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Growth records dated at or after `since`, oldest first.
    async fn growth_since(
        &self,
        id: RepositoryId,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<GrowthRecord>>;
}

/// Repository member storage.
#[async_trait]
pub trait EmailStore: Send + Sync + fmt::Debug + 'static {
    /// Insert an entry unless `(address, repository_id)` exists. Returns
    /// `true` when the entry was inserted.
    async fn insert_if_absent(&self, entry: &EmailEntry) -> AppResult<bool>;

    /// Find a member by address.
    async fn find(&self, repository_id: RepositoryId, address: &str)
    -> AppResult<Option<EmailEntry>>;

    /// Subset of `addresses` that are already members.
    async fn existing_addresses(
        &self,
        repository_id: RepositoryId,
        addresses: &[String],
    ) -> AppResult<HashSet<String>>;

    /// Members added by one `process-csv` job.
    async fn list_by_wave(
        &self,
        repository_id: RepositoryId,
        wave_id: JobId,
    ) -> AppResult<Vec<EmailEntry>>;

    /// All members of a repository.
    async fn list_by_repository(&self, repository_id: RepositoryId) -> AppResult<Vec<EmailEntry>>;

    /// Update a member's verification status. Returns `false` if missing.
    async fn set_verification(
        &self,
        repository_id: RepositoryId,
        address: &str,
        status: VerificationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Contributors ranked by members contributed, descending.
    async fn top_contributors(
        &self,
        repository_id: RepositoryId,
        limit: i64,
    ) -> AppResult<Vec<ContributorStat>>;

    /// Mean quality score of members in `status`; 0 when there are none.
    async fn average_quality(
        &self,
        repository_id: RepositoryId,
        status: VerificationStatus,
    ) -> AppResult<f64>;
}

/// User and contact list storage.
#[async_trait]
pub trait UserStore: Send + Sync + fmt::Debug + 'static {
    /// Persist a new user.
    async fn insert(&self, user: &User) -> AppResult<()>;

    /// Find a user by ID.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    /// Find a user by (normalized) email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Users whose digest preference is `frequency`.
    async fn list_by_digest_frequency(&self, frequency: DigestFrequency) -> AppResult<Vec<User>>;

    /// Persist an uploaded contact list.
    async fn insert_contact_list(&self, list: &ContactList) -> AppResult<()>;

    /// Contact lists uploaded by a user, oldest first.
    async fn contact_lists_for(&self, user_id: UserId) -> AppResult<Vec<ContactList>>;

    /// Lists with a target repository that were never queued, oldest first.
    async fn pending_contact_lists(&self, limit: i64) -> AppResult<Vec<ContactList>>;

    /// Stamp a list as queued. Returns `false` if it was already queued.
    async fn mark_contact_list_queued(&self, id: ContactListId, now: DateTime<Utc>)
    -> AppResult<bool>;

    /// Remove the queued stamp so a later sweep picks the list up again.
    async fn clear_contact_list_queued(&self, id: ContactListId) -> AppResult<()>;
}

/// The set of stores a process works against.
#[derive(Debug, Clone)]
pub struct DataStore {
    /// Job storage.
    pub jobs: Arc<dyn JobStore>,
    /// Repository storage.
    pub repositories: Arc<dyn RepositoryStore>,
    /// Member storage.
    pub emails: Arc<dyn EmailStore>,
    /// User storage.
    pub users: Arc<dyn UserStore>,
}

impl DataStore {
    /// In-memory stores for single-node runs and tests.
    pub fn memory() -> Self {
        Self {
            jobs: Arc::new(MemoryJobStore::new()),
            repositories: Arc::new(MemoryRepositoryStore::new()),
            emails: Arc::new(MemoryEmailStore::new()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }

    /// PostgreSQL stores sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            jobs: Arc::new(PgJobStore::new(pool.clone())),
            repositories: Arc::new(PgRepositoryStore::new(pool.clone())),
            emails: Arc::new(PgEmailStore::new(pool.clone())),
            users: Arc::new(PgUserStore::new(pool)),
        }
    }

    /// Build the backend selected by `store.backend`.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        match config.store.backend.as_str() {
            "memory" => {
                info!("Using in-memory data store");
                Ok(Self::memory())
            }
            "postgres" => {
                let pool = connect(&config.database).await?;
                if config.database.run_migrations {
                    run_migrations(&pool).await?;
                }
                Ok(Self::postgres(pool))
            }
            other => Err(AppError::configuration(format!(
                "Unknown store backend: '{other}'. Expected 'memory' or 'postgres'"
            ))),
        }
    }
}
