//! Uploaded contact list model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use snowball_core::types::id::{ContactListId, RepositoryId, UserId};

/// A contact list a user uploaded earlier.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactList {
    /// Unique list identifier.
    pub id: ContactListId,
    /// Uploading user.
    pub user_id: UserId,
    /// Repository the list was uploaded for, if any.
    pub repository_id: Option<RepositoryId>,
    /// Display name (usually the uploaded file name).
    pub name: String,
    /// Raw CSV text.
    pub csv_payload: String,
    /// When the list was uploaded.
    pub uploaded_at: DateTime<Utc>,
    /// When the sweep queued the list for its repository.
    pub queued_at: Option<DateTime<Utc>>,
}

impl ContactList {
    /// Create a list that has not been queued yet.
    pub fn new(
        user_id: UserId,
        repository_id: Option<RepositoryId>,
        name: impl Into<String>,
        csv_payload: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ContactListId::new(),
            user_id,
            repository_id,
            name: name.into(),
            csv_payload: csv_payload.into(),
            uploaded_at: now,
            queued_at: None,
        }
    }

    /// Whether the sweep should queue this list.
    pub fn is_pending(&self) -> bool {
        self.repository_id.is_some() && self.queued_at.is_none()
    }
}
