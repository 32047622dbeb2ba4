//! Built-in job handler implementations.

pub mod cleanup;
pub mod csv;
pub mod digest;
pub mod network;
pub mod sweep;
pub mod verify;

use std::sync::Arc;

use chrono::Duration;

use snowball_cache::CacheManager;
use snowball_core::config::AppConfig;
use snowball_core::traits::collaborators::EventPublisher;
use snowball_database::DataStore;
use snowball_service::{
    Collaborators, DigestService, GrowthTracker, IngestionPipeline, NetworkAnalyzer,
    QualityScorer, SnowballPlanner,
};

use crate::executor::JobExecutor;
use crate::queue::JobQueue;

pub use cleanup::CleanupJobHandler;
pub use csv::ProcessCsvJobHandler;
pub use digest::{DispatchDigestsJobHandler, SendDigestJobHandler};
pub use network::AnalyzeNetworkJobHandler;
pub use sweep::SnowballSweepJobHandler;
pub use verify::VerifyEmailJobHandler;

/// Everything the built-in handlers depend on.
#[derive(Debug, Clone)]
pub struct JobDependencies {
    /// Data stores.
    pub store: DataStore,
    /// Key/value cache for network snapshots.
    pub cache: CacheManager,
    /// External services.
    pub collaborators: Collaborators,
    /// Real-time event sink.
    pub events: Arc<dyn EventPublisher>,
    /// Queue used for follow-up jobs.
    pub queue: Arc<JobQueue>,
}

/// Register a handler for every built-in job type.
pub fn register_all(executor: &mut JobExecutor, deps: &JobDependencies, config: &AppConfig) {
    let store = &deps.store;
    let scorer = QualityScorer::new(
        Arc::clone(&deps.collaborators.reputation),
        config.snowball.quality_threshold,
    );
    let pipeline = IngestionPipeline::new(
        Arc::clone(&store.repositories),
        Arc::clone(&store.emails),
        scorer,
        config.snowball.max_depth,
    );
    let planner = SnowballPlanner::new(Arc::clone(&store.users), config.snowball.clone());
    let growth = GrowthTracker::new(
        Arc::clone(&store.repositories),
        Arc::clone(&store.users),
        Arc::clone(&deps.collaborators.notifier),
        Arc::clone(&deps.events),
    );
    executor.register(Arc::new(ProcessCsvJobHandler::new(
        pipeline,
        planner,
        growth,
        Arc::clone(&deps.queue),
    )));

    executor.register(Arc::new(VerifyEmailJobHandler::new(
        Arc::clone(&store.emails),
        Arc::clone(&deps.collaborators.verification),
    )));

    executor.register(Arc::new(AnalyzeNetworkJobHandler::new(NetworkAnalyzer::new(
        store.clone(),
        deps.cache.clone(),
        &config.snowball,
    ))));

    let digests = DigestService::new(
        Arc::clone(&store.repositories),
        Arc::clone(&store.users),
        Arc::clone(&deps.collaborators.notifier),
    );
    executor.register(Arc::new(DispatchDigestsJobHandler::new(
        digests.clone(),
        Arc::clone(&deps.queue),
    )));
    executor.register(Arc::new(SendDigestJobHandler::new(digests)));

    executor.register(Arc::new(CleanupJobHandler::new(
        Arc::clone(&deps.queue),
        Duration::hours(config.worker.completed_retention_hours),
        config.worker.failed_retention_days.map(Duration::days),
    )));

    executor.register(Arc::new(SnowballSweepJobHandler::new(
        Arc::clone(&store.users),
        Arc::clone(&deps.queue),
    )));
}
