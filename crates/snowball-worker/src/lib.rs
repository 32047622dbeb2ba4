//! Background job processing and scheduled tasks for Snowball.
//!
//! This crate provides:
//! - A durable job queue over the [`JobStore`](snowball_database::JobStore) backends
//! - A job executor that dispatches jobs to the correct handler
//! - A worker pool running one polling worker per queue, plus a stall sweeper
//! - A cron scheduler for recurring jobs
//! - Handlers for every built-in job type

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{JobOptions, JobQueue};
pub use runner::{WorkerPool, WorkerRunner};
pub use scheduler::CronScheduler;
