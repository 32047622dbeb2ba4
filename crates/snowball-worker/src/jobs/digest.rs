//! `dispatch-digests` and `send-digest`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

use snowball_core::AppError;
use snowball_entity::job::{Job, JobPayload};
use snowball_service::DigestService;

use crate::executor::{JobExecutionError, JobHandler, unexpected_payload};
use crate::queue::{JobOptions, JobQueue};

/// Enqueues one `send-digest` per repository whose owner wants the frequency.
#[derive(Debug)]
pub struct DispatchDigestsJobHandler {
    digests: DigestService,
    queue: Arc<JobQueue>,
}

impl DispatchDigestsJobHandler {
    /// Create a new handler.
    pub fn new(digests: DigestService, queue: Arc<JobQueue>) -> Self {
        Self { digests, queue }
    }
}

#[async_trait]
impl JobHandler for DispatchDigestsJobHandler {
    fn job_type(&self) -> &'static str {
        "dispatch-digests"
    }

    async fn execute(&self, _job: &Job, payload: JobPayload) -> Result<Option<Value>, JobExecutionError> {
        let frequency = match payload {
            JobPayload::DispatchDigests { frequency } => frequency,
            other => return Err(unexpected_payload(self.job_type(), &other)),
        };

        let planned = self.digests.plan_dispatch(frequency).await?;
        for digest in &planned {
            self.queue
                .enqueue_payload(&JobPayload::SendDigest(digest.clone()), JobOptions::default())
                .await?;
        }
        info!(frequency = %frequency, enqueued = planned.len(), "Digests dispatched");
        Ok(Some(json!({ "frequency": frequency, "enqueued": planned.len() })))
    }
}

/// Delivers one repository digest.
#[derive(Debug)]
pub struct SendDigestJobHandler {
    digests: DigestService,
}

impl SendDigestJobHandler {
    /// Create a new handler.
    pub fn new(digests: DigestService) -> Self {
        Self { digests }
    }
}

#[async_trait]
impl JobHandler for SendDigestJobHandler {
    fn job_type(&self) -> &'static str {
        "send-digest"
    }

    async fn execute(&self, _job: &Job, payload: JobPayload) -> Result<Option<Value>, JobExecutionError> {
        let params = match payload {
            JobPayload::SendDigest(params) => params,
            other => return Err(unexpected_payload(self.job_type(), &other)),
        };
        let summary = self.digests.send(&params, Utc::now()).await?;
        Ok(Some(serde_json::to_value(summary).map_err(AppError::from)?))
    }
}
