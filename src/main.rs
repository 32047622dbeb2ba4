//! Snowball Server: background job processing and viral list distribution
//!
//! Main entry point that wires all crates together and runs the worker pool
//! and cron scheduler until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use snowball_cache::CacheManager;
use snowball_core::config::AppConfig;
use snowball_core::error::AppError;
use snowball_core::traits::collaborators::EventPublisher;
use snowball_database::DataStore;
use snowball_service::{Collaborators, MemoryPubSub};
use snowball_worker::jobs::{JobDependencies, register_all};
use snowball_worker::{CronScheduler, JobExecutor, JobQueue, WorkerPool};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load `config/default.toml`, the environment overlay and `SNOWBALL__` variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SNOWBALL_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Snowball v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Data store ───────────────────────────────────────
    tracing::info!(backend = %config.store.backend, "Opening data store...");
    let store = DataStore::from_config(&config).await?;

    // ── Step 2: Cache and collaborators ──────────────────────────
    let cache = CacheManager::new(&config.cache)?;
    let collaborators = Collaborators::from_config(&config);
    let events: Arc<dyn EventPublisher> = Arc::new(MemoryPubSub::default());

    // ── Step 3: Queue and executor ───────────────────────────────
    let queue = Arc::new(JobQueue::new(
        Arc::clone(&store.jobs),
        &config.worker,
        config.snowball.max_depth,
    ));

    let mut executor = JobExecutor::new(config.snowball.max_depth);
    let deps = JobDependencies {
        store,
        cache,
        collaborators,
        events,
        queue: Arc::clone(&queue),
    };
    register_all(&mut executor, &deps, &config);
    let executor = Arc::new(executor);
    tracing::info!(handlers = ?executor.registered_types(), "Job handlers registered");

    // ── Step 4: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Worker pool ──────────────────────────────────────
    let worker_handle = if config.worker.enabled {
        let pool = WorkerPool::new(
            Arc::clone(&queue),
            Arc::clone(&executor),
            config.worker.clone(),
        );
        tracing::info!(worker_id = %pool.worker_id(), "Starting worker pool...");
        let cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            pool.run(cancel).await;
        }))
    } else {
        tracing::info!("Worker pool disabled");
        None
    };

    // ── Step 6: Cron scheduler ───────────────────────────────────
    let mut scheduler = if config.scheduler.enabled {
        let scheduler = CronScheduler::new(Arc::clone(&queue)).await?;
        scheduler.register_default_tasks(&config.scheduler).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    // ── Step 7: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler shutdown failed");
        }
    }

    let _ = shutdown_tx.send(true);

    if let Some(handle) = worker_handle {
        // The pool drains within its own timeout; allow a little slack on top.
        let grace = Duration::from_secs(config.worker.shutdown_timeout_seconds + 5);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Worker pool did not stop in time");
        }
    }

    tracing::info!("Snowball server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
