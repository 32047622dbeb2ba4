//! In-memory user and contact list store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::types::id::{ContactListId, UserId};
use snowball_entity::user::{ContactList, DigestFrequency, User};

use crate::store::UserStore;

#[derive(Debug, Default)]
struct InnerState {
    users: HashMap<UserId, User>,
    contact_lists: Vec<ContactList>,
}

/// In-memory user store.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AppError::conflict(format!(
                "User with email {} already exists",
                user.email
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_by_digest_frequency(&self, frequency: DigestFrequency) -> AppResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.metadata.digest_frequency == frequency)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn insert_contact_list(&self, list: &ContactList) -> AppResult<()> {
        self.state.lock().await.contact_lists.push(list.clone());
        Ok(())
    }

    async fn contact_lists_for(&self, user_id: UserId) -> AppResult<Vec<ContactList>> {
        let state = self.state.lock().await;
        Ok(state
            .contact_lists
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn pending_contact_lists(&self, limit: i64) -> AppResult<Vec<ContactList>> {
        let state = self.state.lock().await;
        Ok(state
            .contact_lists
            .iter()
            .filter(|l| l.is_pending())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_contact_list_queued(
        &self,
        id: ContactListId,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state
            .contact_lists
            .iter_mut()
            .find(|l| l.id == id && l.queued_at.is_none())
        {
            Some(list) => {
                list.queued_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_contact_list_queued(&self, id: ContactListId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(list) = state.contact_lists.iter_mut().find(|l| l.id == id) {
            list.queued_at = None;
        }
        Ok(())
    }
}
