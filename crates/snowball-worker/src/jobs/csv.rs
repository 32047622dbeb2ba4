//! `process-csv`: one snowball wave.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use snowball_core::AppError;
use snowball_entity::job::{Job, JobPayload};
use snowball_service::{CsvProcessingResult, GrowthTracker, IngestionPipeline, SnowballPlanner};

use crate::executor::{JobExecutionError, JobHandler, unexpected_payload};
use crate::queue::{JobOptions, JobQueue};

/// Result recorded on a completed wave.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveReport {
    /// Ingestion counters.
    #[serde(flatten)]
    pub result: CsvProcessingResult,
    /// Depth of the wave.
    pub depth: u32,
    /// Verification jobs enqueued.
    pub verifications_scheduled: usize,
    /// Next-depth waves enqueued.
    pub children_scheduled: usize,
    /// Repository growth rate after the wave.
    pub growth_rate: f64,
}

/// Ingests a CSV, fans out follow-up jobs and records growth.
#[derive(Debug)]
pub struct ProcessCsvJobHandler {
    pipeline: IngestionPipeline,
    planner: SnowballPlanner,
    growth: GrowthTracker,
    queue: Arc<JobQueue>,
}

impl ProcessCsvJobHandler {
    /// Create a new handler.
    pub fn new(
        pipeline: IngestionPipeline,
        planner: SnowballPlanner,
        growth: GrowthTracker,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            pipeline,
            planner,
            growth,
            queue,
        }
    }
}

#[async_trait]
impl JobHandler for ProcessCsvJobHandler {
    fn job_type(&self) -> &'static str {
        "process-csv"
    }

    async fn execute(&self, job: &Job, payload: JobPayload) -> Result<Option<Value>, JobExecutionError> {
        let params = match payload {
            JobPayload::ProcessCsv(params) => params,
            other => return Err(unexpected_payload(self.job_type(), &other)),
        };

        // Ingestion and growth are idempotent per job, so a retry resumes
        // where the failed attempt stopped. Follow-up jobs may be enqueued
        // twice; a repeated wave finds its rows already present.
        let outcome = self.pipeline.process(&params, job.id).await?;
        let update = self
            .growth
            .record_batch(
                params.repository_id,
                Some(job.id),
                outcome.result.added as i64,
                Utc::now(),
            )
            .await?;

        let plan = self.planner.plan(&params, &outcome.accepted).await?;
        let verifications_scheduled = plan.verifications.len();
        let children_scheduled = plan.children.len();
        for planned in plan.into_jobs() {
            self.queue
                .enqueue_payload(
                    &planned.payload,
                    JobOptions::delayed(planned.delay_ms, planned.priority),
                )
                .await?;
        }

        info!(
            job_id = %job.id,
            repository_id = %params.repository_id,
            depth = params.depth,
            added = outcome.result.added,
            children = children_scheduled,
            "Snowball wave finished"
        );

        let report = WaveReport {
            result: outcome.result,
            depth: params.depth,
            verifications_scheduled,
            children_scheduled,
            growth_rate: update.growth_rate,
        };
        Ok(Some(serde_json::to_value(report).map_err(AppError::from)?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::DateTime;
    use snowball_core::config::{SnowballConfig, WorkerConfig};
    use snowball_core::result::AppResult;
    use snowball_core::types::id::{JobId, RepositoryId, UserId};
    use snowball_database::DataStore;
    use snowball_database::store::RepositoryStore;
    use snowball_entity::job::{JobStatus, ProcessCsvPayload};
    use snowball_entity::repository::{GrowthRecord, Repository};
    use snowball_entity::user::{ContactList, User};
    use snowball_service::clients::{LogNotificationSender, ZeroReputationService};
    use snowball_service::{MemoryPubSub, QualityScorer};

    use super::*;
    use crate::queue::JobOptions;

    /// Repository store whose next `record_growth` calls fail.
    #[derive(Debug)]
    struct FailingGrowth {
        inner: Arc<dyn RepositoryStore>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl RepositoryStore for FailingGrowth {
        async fn insert(&self, repository: &Repository) -> AppResult<()> {
            self.inner.insert(repository).await
        }

        async fn find_by_id(&self, id: RepositoryId) -> AppResult<Option<Repository>> {
            self.inner.find_by_id(id).await
        }

        async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Repository>> {
            self.inner.list_by_owner(owner_id).await
        }

        async fn record_growth(
            &self,
            id: RepositoryId,
            wave_id: Option<JobId>,
            added: i64,
            now: DateTime<Utc>,
        ) -> AppResult<Option<GrowthRecord>> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(AppError::database("connection reset"));
            }
            self.inner.record_growth(id, wave_id, added, now).await
        }

        async fn update_growth_rate(
            &self,
            id: RepositoryId,
            growth_rate: f64,
            now: DateTime<Utc>,
        ) -> AppResult<()> {
            self.inner.update_growth_rate(id, growth_rate, now).await
        }

        async fn growth_since(
            &self,
            id: RepositoryId,
            since: DateTime<Utc>,
        ) -> AppResult<Vec<GrowthRecord>> {
            self.inner.growth_since(id, since).await
        }
    }

    struct Fixture {
        store: DataStore,
        queue: Arc<JobQueue>,
        handler: ProcessCsvJobHandler,
        repo: Repository,
    }

    async fn fixture() -> Fixture {
        fixture_on(DataStore::memory()).await
    }

    async fn fixture_on(store: DataStore) -> Fixture {
        let mut repo = Repository::new(UserId::new(), "news", Utc::now());
        repo.trusted_domains = vec!["trusted.org".to_string()];
        store.repositories.insert(&repo).await.unwrap();

        let config = SnowballConfig::default();
        let queue = Arc::new(JobQueue::new(store.jobs.clone(), &WorkerConfig::default(), config.max_depth));
        let pipeline = IngestionPipeline::new(
            store.repositories.clone(),
            store.emails.clone(),
            QualityScorer::new(Arc::new(ZeroReputationService), config.quality_threshold),
            config.max_depth,
        );
        let planner = SnowballPlanner::new(store.users.clone(), config);
        let growth = GrowthTracker::new(
            store.repositories.clone(),
            store.users.clone(),
            Arc::new(LogNotificationSender),
            Arc::new(MemoryPubSub::default()),
        );
        let handler = ProcessCsvJobHandler::new(pipeline, planner, growth, queue.clone());
        Fixture {
            store,
            queue,
            handler,
            repo,
        }
    }

    fn wave(fx: &Fixture, depth: u32) -> JobPayload {
        JobPayload::ProcessCsv(ProcessCsvPayload {
            repository_id: fx.repo.id,
            csv_payload: "email,name\ncarol@trusted.org,Carol\ndave@trusted.org,Dave\n".to_string(),
            user_id: UserId::new(),
            depth,
            source: Some("verified_user".to_string()),
            contact_list_id: None,
        })
    }

    async fn run(fx: &Fixture, depth: u32) -> Value {
        let payload = wave(fx, depth);
        let job = fx.queue.enqueue_payload(&payload, JobOptions::default()).await.unwrap();
        fx.handler.execute(&job, payload).await.unwrap().unwrap()
    }

    async fn register_carol(fx: &Fixture) {
        let carol = User::new("carol@trusted.org", "Carol", Utc::now());
        fx.store.users.insert(&carol).await.unwrap();
        fx.store
            .users
            .insert_contact_list(&ContactList::new(carol.id, None, "friends.csv", "email\nerin@trusted.org\n", Utc::now()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wave_schedules_verifications_and_children() {
        let fx = fixture().await;
        register_carol(&fx).await;

        let report = run(&fx, 0).await;
        assert_eq!(report["added"], 2);
        assert_eq!(report["verificationsScheduled"], 2);
        assert_eq!(report["childrenScheduled"], 1);

        let delayed = fx.store.jobs.list_by_status(JobStatus::Delayed, 10).await.unwrap();
        let child = delayed
            .iter()
            .find(|j| j.job_type == "process-csv")
            .expect("child wave enqueued");
        assert_eq!(child.queue, "snowball-distribution");
        assert_eq!(child.payload["depth"], 1);
        assert_eq!(child.priority, 3);

        let stored = fx.store.repositories.find_by_id(fx.repo.id).await.unwrap().unwrap();
        assert_eq!(stored.email_count, 2);
    }

    #[tokio::test]
    async fn test_max_depth_wave_spawns_no_children() {
        let fx = fixture().await;
        register_carol(&fx).await;
        let report = run(&fx, 3).await;
        assert_eq!(report["childrenScheduled"], 0);
        assert_eq!(report["depth"], 3);
    }

    #[tokio::test]
    async fn test_resubmission_adds_nothing() {
        let fx = fixture().await;
        run(&fx, 0).await;
        let again = run(&fx, 0).await;
        assert_eq!(again["added"], 0);
        assert_eq!(again["verificationsScheduled"], 0);
        let stored = fx.store.repositories.find_by_id(fx.repo.id).await.unwrap().unwrap();
        assert_eq!(stored.growth_history.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_growth_failure_resumes_wave() {
        let mut store = DataStore::memory();
        store.repositories = Arc::new(FailingGrowth {
            inner: store.repositories.clone(),
            failures: AtomicUsize::new(1),
        });
        let fx = fixture_on(store).await;
        register_carol(&fx).await;

        let payload = wave(&fx, 0);
        let job = fx.queue.enqueue_payload(&payload, JobOptions::default()).await.unwrap();
        let err = fx.handler.execute(&job, payload.clone()).await.unwrap_err();
        assert!(err.is_retryable());

        let report = fx.handler.execute(&job, payload.clone()).await.unwrap().unwrap();
        assert_eq!(report["added"], 2);
        assert_eq!(report["verificationsScheduled"], 2);
        assert_eq!(report["childrenScheduled"], 1);

        let members = fx.store.emails.list_by_repository(fx.repo.id).await.unwrap();
        assert_eq!(members.len(), 2);
        let stored = fx.store.repositories.find_by_id(fx.repo.id).await.unwrap().unwrap();
        assert_eq!(stored.email_count, 2);
        assert_eq!(stored.growth_history.len(), 1);

        // A further replay of the same job counts nothing twice.
        let replay = fx.handler.execute(&job, payload).await;
        assert!(replay.is_ok());
        let stored = fx.store.repositories.find_by_id(fx.repo.id).await.unwrap().unwrap();
        assert_eq!(stored.email_count, 2);
        assert_eq!(stored.growth_history.len(), 1);
    }
}
