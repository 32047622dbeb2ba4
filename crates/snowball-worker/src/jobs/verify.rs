//! `verify-email`: deliverability check of an accepted address.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info};

use snowball_core::traits::collaborators::EmailVerificationService;
use snowball_database::EmailStore;
use snowball_entity::email::VerificationStatus;
use snowball_entity::job::{Job, JobPayload};

use crate::executor::{JobExecutionError, JobHandler, unexpected_payload};

/// Sets an entry `active` or `invalid` from the verification service.
#[derive(Debug)]
pub struct VerifyEmailJobHandler {
    emails: Arc<dyn EmailStore>,
    verifier: Arc<dyn EmailVerificationService>,
}

impl VerifyEmailJobHandler {
    /// Create a new handler.
    pub fn new(emails: Arc<dyn EmailStore>, verifier: Arc<dyn EmailVerificationService>) -> Self {
        Self { emails, verifier }
    }
}

#[async_trait]
impl JobHandler for VerifyEmailJobHandler {
    fn job_type(&self) -> &'static str {
        "verify-email"
    }

    async fn execute(&self, _job: &Job, payload: JobPayload) -> Result<Option<Value>, JobExecutionError> {
        let params = match payload {
            JobPayload::VerifyEmail(params) => params,
            other => return Err(unexpected_payload(self.job_type(), &other)),
        };

        if self
            .emails
            .find(params.repository_id, &params.email)
            .await?
            .is_none()
        {
            debug!(email = %params.email, "Entry no longer exists; nothing to verify");
            return Ok(Some(json!({ "email": params.email, "status": "missing" })));
        }

        let status = if self.verifier.verify(&params.email).await? {
            VerificationStatus::Active
        } else {
            VerificationStatus::Invalid
        };
        self.emails
            .set_verification(params.repository_id, &params.email, status, Utc::now())
            .await?;

        info!(email = %params.email, status = status.as_str(), "Email verified");
        Ok(Some(json!({ "email": params.email, "status": status.as_str() })))
    }
}

#[cfg(test)]
mod tests {
    use snowball_core::result::AppResult;
    use snowball_core::types::id::RepositoryId;
    use snowball_database::DataStore;
    use snowball_entity::email::EmailEntry;
    use snowball_entity::job::{BackoffPolicy, NewJob, VerifyEmailPayload};

    use super::*;

    #[derive(Debug)]
    struct RejectExample;

    #[async_trait]
    impl EmailVerificationService for RejectExample {
        async fn verify(&self, address: &str) -> AppResult<bool> {
            Ok(!address.ends_with("@example.com"))
        }
    }

    fn job(payload: &JobPayload) -> Job {
        Job::from_new(
            NewJob {
                queue: "email-processing".to_string(),
                job_type: payload.job_type().to_string(),
                payload: serde_json::to_value(payload).unwrap(),
                max_attempts: 3,
                backoff: BackoffPolicy::default(),
                priority: 0,
                delay_ms: 0,
            },
            Utc::now(),
        )
    }

    async fn verify(store: &DataStore, repository_id: RepositoryId, email: &str) -> Value {
        let handler = VerifyEmailJobHandler::new(store.emails.clone(), Arc::new(RejectExample));
        let payload = JobPayload::VerifyEmail(VerifyEmailPayload {
            email: email.to_string(),
            repository_id,
        });
        handler.execute(&job(&payload), payload).await.unwrap().unwrap()
    }

    fn entry(repository_id: RepositoryId, address: &str) -> EmailEntry {
        EmailEntry {
            address: address.to_string(),
            repository_id,
            name: None,
            source: "csv_upload".to_string(),
            tags: Vec::new(),
            quality_score: 0.7,
            verification_status: VerificationStatus::Pending,
            snowball_depth: 0,
            contributor_id: None,
            wave_id: None,
            added_at: Utc::now(),
            verified_at: None,
        }
    }

    #[tokio::test]
    async fn test_sets_status_from_service() {
        let store = DataStore::memory();
        let repo = RepositoryId::new();
        store.emails.insert_if_absent(&entry(repo, "a@good.org")).await.unwrap();
        store.emails.insert_if_absent(&entry(repo, "b@example.com")).await.unwrap();

        assert_eq!(verify(&store, repo, "a@good.org").await["status"], "active");
        assert_eq!(verify(&store, repo, "b@example.com").await["status"], "invalid");

        let a = store.emails.find(repo, "a@good.org").await.unwrap().unwrap();
        assert_eq!(a.verification_status, VerificationStatus::Active);
        assert!(a.verified_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_entry_is_noop() {
        let store = DataStore::memory();
        let result = verify(&store, RepositoryId::new(), "gone@x.org").await;
        assert_eq!(result["status"], "missing");
    }
}
