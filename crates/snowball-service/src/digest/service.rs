//! Digest planning and delivery.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::NotificationSender;
use snowball_core::types::id::RepositoryId;
use snowball_database::store::{RepositoryStore, UserStore};
use snowball_entity::job::DigestPayload;
use snowball_entity::user::DigestFrequency;

/// Notification template used for digests.
pub const DIGEST_TEMPLATE: &str = "repository_digest";

/// Content of one delivered digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestSummary {
    /// Summarized repository.
    pub repository_id: RepositoryId,
    /// Repository name.
    pub repository_name: String,
    /// Digest window.
    pub frequency: DigestFrequency,
    /// Start of the window.
    pub since: DateTime<Utc>,
    /// Members added during the window.
    pub added: i64,
    /// Batches recorded during the window.
    pub batches: usize,
    /// Current repository size.
    pub total: i64,
    /// Current growth rate.
    pub growth_rate: f64,
}

/// Plans and sends per-repository digests.
#[derive(Debug, Clone)]
pub struct DigestService {
    repositories: Arc<dyn RepositoryStore>,
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn NotificationSender>,
}

impl DigestService {
    /// Create a new digest service.
    pub fn new(
        repositories: Arc<dyn RepositoryStore>,
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            repositories,
            users,
            notifier,
        }
    }

    /// One payload per repository whose owner wants `frequency` digests.
    pub async fn plan_dispatch(&self, frequency: DigestFrequency) -> AppResult<Vec<DigestPayload>> {
        if frequency == DigestFrequency::None {
            return Ok(Vec::new());
        }

        let mut payloads = Vec::new();
        for owner in self.users.list_by_digest_frequency(frequency).await? {
            for repository in self.repositories.list_by_owner(owner.id).await? {
                payloads.push(DigestPayload {
                    repository_id: repository.id,
                    frequency,
                });
            }
        }
        debug!(frequency = %frequency, count = payloads.len(), "Digest dispatch planned");
        Ok(payloads)
    }

    /// Summarize the window ending at `now` and send it to the owner.
    pub async fn send(&self, payload: &DigestPayload, now: DateTime<Utc>) -> AppResult<DigestSummary> {
        let window = payload.frequency.window().ok_or_else(|| {
            AppError::validation("Digest frequency 'none' cannot be delivered")
        })?;
        let repository = self
            .repositories
            .find_by_id(payload.repository_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Repository {} not found", payload.repository_id))
            })?;

        let since = now - window;
        let records = self.repositories.growth_since(repository.id, since).await?;
        let summary = DigestSummary {
            repository_id: repository.id,
            repository_name: repository.name.clone(),
            frequency: payload.frequency,
            since,
            added: records.iter().map(|r| r.count_added).sum(),
            batches: records.len(),
            total: repository.email_count,
            growth_rate: repository.growth_rate,
        };

        let data = serde_json::to_value(&summary)?;
        self.notifier
            .send(repository.owner_id, DIGEST_TEMPLATE, &data)
            .await?;
        info!(
            repository_id = %repository.id,
            frequency = %payload.frequency,
            added = summary.added,
            "Digest sent"
        );
        Ok(summary)
    }
}
