//! Growth tracker.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::{EventPublisher, NotificationSender};
use snowball_core::types::id::{JobId, RepositoryId, UserId};
use snowball_database::store::{RepositoryStore, UserStore};
use snowball_entity::repository::GrowthRecord;

/// Event type published after a batch grows a repository.
pub const GROWTH_EVENT: &str = "repository.growth";
/// Notification template sent to owners who opted in.
pub const GROWTH_TEMPLATE: &str = "repository_growth";

/// Pub/sub channel of a repository.
pub fn repository_channel(repository_id: RepositoryId) -> String {
    format!("repository:{repository_id}")
}

/// `((new - old) / old) / days_active`; zero when `old == 0` or the
/// repository is younger than one day.
pub fn growth_rate(old_total: i64, new_total: i64, days_active: f64) -> f64 {
    if old_total == 0 || days_active < 1.0 {
        return 0.0;
    }
    ((new_total - old_total) as f64 / old_total as f64) / days_active
}

/// Result of recording one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthUpdate {
    /// Repository that grew.
    pub repository_id: RepositoryId,
    /// Appended growth record; `None` when the batch added nothing.
    pub record: Option<GrowthRecord>,
    /// Growth rate after the batch.
    pub growth_rate: f64,
    /// Whether the owner was notified.
    pub notified: bool,
}

/// Updates repository statistics after a batch and informs the owner.
#[derive(Debug, Clone)]
pub struct GrowthTracker {
    repositories: Arc<dyn RepositoryStore>,
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn NotificationSender>,
    events: Arc<dyn EventPublisher>,
}

impl GrowthTracker {
    /// Create a new tracker.
    pub fn new(
        repositories: Arc<dyn RepositoryStore>,
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn NotificationSender>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repositories,
            users,
            notifier,
            events,
        }
    }

    /// Record `added` new members for a repository.
    ///
    /// A batch that added nothing leaves the repository untouched. A wave
    /// whose growth is already recorded only refreshes the rate, so a
    /// retried wave neither counts its members twice nor notifies again.
    /// Event and notification failures are logged and do not fail the batch.
    pub async fn record_batch(
        &self,
        repository_id: RepositoryId,
        wave_id: Option<JobId>,
        added: i64,
        now: DateTime<Utc>,
    ) -> AppResult<GrowthUpdate> {
        let repository = self
            .repositories
            .find_by_id(repository_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Repository {repository_id} not found")))?;

        if added <= 0 {
            return Ok(GrowthUpdate {
                repository_id,
                record: None,
                growth_rate: repository.growth_rate,
                notified: false,
            });
        }

        let recorded = self
            .repositories
            .record_growth(repository_id, wave_id, added, now)
            .await?;
        let (record, replayed) = match recorded {
            Some(record) => (record, false),
            None => {
                let record = repository
                    .growth_history
                    .iter()
                    .find(|r| r.wave_id == wave_id)
                    .cloned()
                    .ok_or_else(|| {
                        AppError::internal(format!(
                            "Growth record of repository {repository_id} vanished"
                        ))
                    })?;
                (record, true)
            }
        };
        let old_total = record.total - record.count_added;
        let rate = growth_rate(old_total, record.total, repository.days_active(now));
        self.repositories
            .update_growth_rate(repository_id, rate, now)
            .await?;

        if replayed {
            debug!(repository_id = %repository_id, "Growth already recorded for this wave");
            return Ok(GrowthUpdate {
                repository_id,
                record: Some(record),
                growth_rate: rate,
                notified: false,
            });
        }

        info!(
            repository_id = %repository_id,
            added,
            total = record.total,
            growth_rate = rate,
            "Repository grew"
        );

        let event = json!({
            "type": GROWTH_EVENT,
            "repositoryId": repository_id,
            "countAdded": record.count_added,
            "total": record.total,
            "growthRate": rate,
            "at": record.date,
        });
        if let Err(e) = self
            .events
            .publish(&repository_channel(repository_id), &event)
            .await
        {
            warn!(repository_id = %repository_id, error = %e, "Failed to publish growth event");
        }

        let notified = self.notify_owner(repository.owner_id, &repository.name, &event).await;

        Ok(GrowthUpdate {
            repository_id,
            record: Some(record),
            growth_rate: rate,
            notified,
        })
    }

    async fn notify_owner(
        &self,
        owner_id: UserId,
        repository_name: &str,
        event: &serde_json::Value,
    ) -> bool {
        let owner = match self.users.find_by_id(owner_id).await {
            Ok(Some(owner)) => owner,
            Ok(None) => return false,
            Err(e) => {
                warn!(owner_id = %owner_id, error = %e, "Failed to load repository owner");
                return false;
            }
        };
        if !owner.metadata.notify_on_growth {
            return false;
        }

        let mut data = event.clone();
        data["repositoryName"] = json!(repository_name);
        match self.notifier.send(owner.id, GROWTH_TEMPLATE, &data).await {
            Ok(()) => true,
            Err(e) => {
                warn!(owner_id = %owner.id, error = %e, "Failed to send growth notification");
                false
            }
        }
    }
}
