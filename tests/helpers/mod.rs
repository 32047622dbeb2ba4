//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use snowball_cache::{CacheManager, ReputationCache};
use snowball_core::config::AppConfig;
use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::{
    DomainReputationService, EmailVerificationService, NotificationSender,
};
use snowball_core::types::id::{JobId, RepositoryId, UserId};
use snowball_database::DataStore;
use snowball_entity::job::{Job, JobPayload, ProcessCsvPayload};
use snowball_entity::repository::Repository;
use snowball_entity::user::{ContactList, User};
use snowball_service::{Collaborators, MemoryPubSub};
use snowball_worker::jobs::{JobDependencies, register_all};
use snowball_worker::queue::FailureOutcome;
use snowball_worker::{JobExecutionError, JobExecutor, JobOptions, JobQueue};

/// Worker id used when tests drive the queue by hand.
pub const TEST_WORKER: &str = "test-worker";

/// Reputation service answering from a fixed table; unknown domains score 0.
#[derive(Debug, Default)]
pub struct FixedReputation {
    scores: HashMap<String, f64>,
}

impl FixedReputation {
    pub fn with(domain: &str, score: f64) -> Self {
        let mut scores = HashMap::new();
        scores.insert(domain.to_string(), score);
        Self { scores }
    }
}

#[async_trait]
impl DomainReputationService for FixedReputation {
    async fn check(&self, domain: &str) -> AppResult<f64> {
        Ok(self.scores.get(domain).copied().unwrap_or(0.0))
    }
}

/// Verification service with a fixed answer, or an outage.
#[derive(Debug, Clone, Copy)]
pub enum StubVerification {
    Deliverable,
    Undeliverable,
    Down,
}

#[async_trait]
impl EmailVerificationService for StubVerification {
    async fn verify(&self, _address: &str) -> AppResult<bool> {
        match self {
            Self::Deliverable => Ok(true),
            Self::Undeliverable => Ok(false),
            Self::Down => Err(AppError::service_unavailable("verification service down")),
        }
    }
}

/// Notification sender that records every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(UserId, String, Value)>>,
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, owner_id: UserId, template: &str, data: &Value) -> AppResult<()> {
        self.sent
            .lock()
            .await
            .push((owner_id, template.to_string(), data.clone()));
        Ok(())
    }
}

/// Test application context: memory stores, stub collaborators and a fully
/// registered executor.
pub struct TestApp {
    pub config: AppConfig,
    pub store: DataStore,
    pub queue: Arc<JobQueue>,
    pub executor: Arc<JobExecutor>,
    pub events: Arc<MemoryPubSub>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Configuration with no delays so every follow-up job is claimable at once.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.snowball.verification_jitter_max_ms = 0;
    config.snowball.depth_delay_seconds = 0;
    config.worker.poll_interval_ms = 10;
    config.worker.lock_duration_ms = 1_000;
    config.worker.stall_check_interval_ms = 50;
    config.worker.shutdown_timeout_seconds = 2;
    config.worker.default_backoff_ms = 1;
    config.scheduler.enabled = false;
    config
}

impl TestApp {
    /// Create a new test application with deliverable verification.
    pub async fn new() -> Self {
        Self::with_verification(StubVerification::Deliverable).await
    }

    /// Create a new test application with the given verification outcome.
    pub async fn with_verification(verification: StubVerification) -> Self {
        let config = test_config();
        let store = DataStore::memory();
        let cache = CacheManager::new(&config.cache).expect("Failed to init cache");
        let notifier = Arc::new(RecordingNotifier::default());
        let events = Arc::new(MemoryPubSub::default());

        let reputation = ReputationCache::with_ttl(
            Arc::new(FixedReputation::with("reputable.com", 1.0)),
            Duration::from_secs(60),
            100,
        );
        let collaborators = Collaborators {
            reputation: Arc::new(reputation),
            verification: Arc::new(verification),
            notifier: notifier.clone(),
        };

        let queue = Arc::new(JobQueue::new(
            store.jobs.clone(),
            &config.worker,
            config.snowball.max_depth,
        ));
        let mut executor = JobExecutor::new(config.snowball.max_depth);
        let deps = JobDependencies {
            store: store.clone(),
            cache,
            collaborators,
            events: events.clone(),
            queue: queue.clone(),
        };
        register_all(&mut executor, &deps, &config);

        Self {
            config,
            store,
            queue,
            executor: Arc::new(executor),
            events,
            notifier,
        }
    }

    /// Persist a repository trusting `trusted` domains, owned by a new user.
    pub async fn seed_repository(&self, trusted: &[&str]) -> Repository {
        let mut owner = User::new(
            format!("owner-{}@owner.org", UserId::new()),
            "Owner",
            Utc::now(),
        );
        owner.metadata.notify_on_growth = true;
        self.store.users.insert(&owner).await.expect("insert owner");

        let mut repo = Repository::new(owner.id, "newsletter", Utc::now());
        repo.trusted_domains = trusted.iter().map(|d| d.to_string()).collect();
        self.store
            .repositories
            .insert(&repo)
            .await
            .expect("insert repository");
        repo
    }

    /// Register a user who owns one contact list with `csv`.
    pub async fn seed_member(&self, email: &str, csv: &str) -> User {
        let user = User::new(email, email, Utc::now());
        self.store.users.insert(&user).await.expect("insert user");
        let list = ContactList::new(user.id, None, "contacts.csv", csv, Utc::now());
        self.store
            .users
            .insert_contact_list(&list)
            .await
            .expect("insert contact list");
        user
    }

    /// Enqueue an upload at `depth`.
    pub async fn upload(
        &self,
        repository_id: RepositoryId,
        user_id: UserId,
        csv: &str,
        depth: u32,
    ) -> AppResult<Job> {
        let payload = JobPayload::ProcessCsv(ProcessCsvPayload {
            repository_id,
            csv_payload: csv.to_string(),
            user_id,
            depth,
            source: None,
            contact_list_id: None,
        });
        self.queue.enqueue_payload(&payload, JobOptions::default()).await
    }

    /// Claim, execute and settle the next job of `queue`.
    pub async fn run_next(
        &self,
        queue: &str,
    ) -> Option<(Job, Result<Option<Value>, JobExecutionError>)> {
        let job = self
            .queue
            .claim(queue, TEST_WORKER)
            .await
            .expect("claim")?;
        let outcome = self.executor.execute(&job).await;
        match &outcome {
            Ok(result) => {
                self.queue
                    .complete(&job, TEST_WORKER, result.as_ref())
                    .await
                    .expect("complete");
            }
            Err(e) => {
                let settled = self
                    .queue
                    .fail(&job, TEST_WORKER, e.message(), e.is_retryable())
                    .await
                    .expect("fail");
                assert_ne!(settled, FailureOutcome::LockLost);
            }
        }
        Some((job, outcome))
    }

    /// Run jobs of `queue` until none is claimable.
    pub async fn drain(&self, queue: &str) -> usize {
        let mut ran = 0;
        while self.run_next(queue).await.is_some() {
            ran += 1;
        }
        ran
    }

    /// Reload a job.
    pub async fn job(&self, id: JobId) -> Job {
        self.queue
            .get(id)
            .await
            .expect("load job")
            .expect("job exists")
    }
}
