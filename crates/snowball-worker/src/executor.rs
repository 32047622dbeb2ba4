//! Job executor: dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use snowball_core::error::AppError;
use snowball_entity::job::{Job, JobPayload};

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &'static str;

    /// Execute the job with its decoded payload
    async fn execute(&self, job: &Job, payload: JobPayload)
    -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure: do not retry
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure: may retry
    #[error("Transient job failure: {0}")]
    Transient(String),
}

impl JobExecutionError {
    /// Whether the job should be retried (attempts permitting).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Message recorded on the job.
    pub fn message(&self) -> &str {
        match self {
            Self::Permanent(msg) | Self::Transient(msg) => msg,
        }
    }
}

impl From<AppError> for JobExecutionError {
    fn from(err: AppError) -> Self {
        if err.is_retryable() {
            Self::Transient(err.to_string())
        } else {
            Self::Permanent(err.to_string())
        }
    }
}

/// Reject a payload routed to the wrong handler.
pub(crate) fn unexpected_payload(handler: &str, payload: &JobPayload) -> JobExecutionError {
    JobExecutionError::Permanent(format!(
        "Handler '{handler}' cannot process payload of type '{}'",
        payload.job_type()
    ))
}

/// Dispatches jobs to the appropriate handler based on job_type
#[derive(Debug)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    /// Deepest snowball wave that may run
    max_depth: u32,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new(max_depth: u32) -> Self {
        Self {
            handlers: HashMap::new(),
            max_depth,
        }
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler.
    ///
    /// Unknown job types, undecodable payloads and waves deeper than the
    /// maximum depth fail permanently without reaching a handler.
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        let payload = job.decode_payload().map_err(|e| {
            JobExecutionError::Permanent(format!("Invalid payload for job {}: {e}", job.id))
        })?;
        if payload.job_type() != job.job_type {
            return Err(JobExecutionError::Permanent(format!(
                "Payload type '{}' does not match job type '{}'",
                payload.job_type(),
                job.job_type
            )));
        }
        if let Some(depth) = payload.depth().filter(|d| *d > self.max_depth) {
            return Err(JobExecutionError::Permanent(format!(
                "Snowball depth {depth} exceeds maximum {}",
                self.max_depth
            )));
        }

        debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Dispatching job"
        );
        handler.execute(job, payload).await
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}
