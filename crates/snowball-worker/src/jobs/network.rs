//! `analyze-network`: forced snapshot recomputation.

use async_trait::async_trait;
use serde_json::Value;

use snowball_core::AppError;
use snowball_entity::job::{Job, JobPayload};
use snowball_service::NetworkAnalyzer;

use crate::executor::{JobExecutionError, JobHandler, unexpected_payload};

/// Recomputes and caches a repository's network snapshot.
#[derive(Debug)]
pub struct AnalyzeNetworkJobHandler {
    analyzer: NetworkAnalyzer,
}

impl AnalyzeNetworkJobHandler {
    /// Create a new handler.
    pub fn new(analyzer: NetworkAnalyzer) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl JobHandler for AnalyzeNetworkJobHandler {
    fn job_type(&self) -> &'static str {
        "analyze-network"
    }

    async fn execute(&self, _job: &Job, payload: JobPayload) -> Result<Option<Value>, JobExecutionError> {
        let params = match payload {
            JobPayload::AnalyzeNetwork(params) => params,
            other => return Err(unexpected_payload(self.job_type(), &other)),
        };
        let snapshot = self.analyzer.analyze(params.repository_id, true).await?;
        Ok(Some(serde_json::to_value(snapshot).map_err(AppError::from)?))
    }
}
