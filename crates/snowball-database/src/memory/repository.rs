//! In-memory repository store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::types::id::{JobId, RepositoryId, UserId};
use snowball_entity::repository::{GrowthRecord, Repository};

use crate::store::RepositoryStore;

/// In-memory repository store. Growth history is kept on the entity.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepositoryStore {
    repositories: Arc<Mutex<HashMap<RepositoryId, Repository>>>,
}

impl MemoryRepositoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: RepositoryId) -> AppError {
    AppError::not_found(format!("Repository {id} not found"))
}

#[async_trait]
impl RepositoryStore for MemoryRepositoryStore {
    async fn insert(&self, repository: &Repository) -> AppResult<()> {
        let mut repositories = self.repositories.lock().await;
        if repositories.contains_key(&repository.id) {
            return Err(AppError::conflict(format!(
                "Repository {} already exists",
                repository.id
            )));
        }
        repositories.insert(repository.id, repository.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: RepositoryId) -> AppResult<Option<Repository>> {
        Ok(self.repositories.lock().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Repository>> {
        let repositories = self.repositories.lock().await;
        let mut owned: Vec<Repository> = repositories
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(owned)
    }

    async fn record_growth(
        &self,
        id: RepositoryId,
        wave_id: Option<JobId>,
        added: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Option<GrowthRecord>> {
        let mut repositories = self.repositories.lock().await;
        let repository = repositories.get_mut(&id).ok_or_else(|| not_found(id))?;
        if wave_id.is_some() && repository.growth_history.iter().any(|r| r.wave_id == wave_id) {
            return Ok(None);
        }
        repository.email_count += added;
        repository.updated_at = now;
        let record = GrowthRecord {
            date: now,
            count_added: added,
            total: repository.email_count,
            wave_id,
        };
        repository.growth_history.push(record.clone());
        Ok(Some(record))
    }

    async fn update_growth_rate(
        &self,
        id: RepositoryId,
        growth_rate: f64,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut repositories = self.repositories.lock().await;
        let repository = repositories.get_mut(&id).ok_or_else(|| not_found(id))?;
        repository.growth_rate = growth_rate;
        repository.updated_at = now;
        Ok(())
    }

    async fn growth_since(
        &self,
        id: RepositoryId,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<GrowthRecord>> {
        let repositories = self.repositories.lock().await;
        let repository = repositories.get(&id).ok_or_else(|| not_found(id))?;
        Ok(repository
            .growth_history
            .iter()
            .filter(|r| r.date >= since)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn test_record_growth_appends_history() {
        let store = MemoryRepositoryStore::new();
        let now = Utc::now();
        let repo = Repository::new(UserId::new(), "weekly-rust", now);
        store.insert(&repo).await.unwrap();

        let first = store.record_growth(repo.id, None, 4, now).await.unwrap().unwrap();
        assert_eq!(first.total, 4);
        let second = store
            .record_growth(repo.id, None, 2, now + Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.total, 6);

        let stored = store.find_by_id(repo.id).await.unwrap().unwrap();
        assert_eq!(stored.email_count, 6);
        assert_eq!(stored.growth_history.len(), 2);

        let recent = store
            .growth_since(repo.id, now + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(recent, vec![second]);
    }

    #[tokio::test]
    async fn test_record_growth_once_per_wave() {
        let store = MemoryRepositoryStore::new();
        let now = Utc::now();
        let repo = Repository::new(UserId::new(), "weekly-rust", now);
        store.insert(&repo).await.unwrap();
        let wave = JobId::new();

        let record = store.record_growth(repo.id, Some(wave), 3, now).await.unwrap();
        assert_eq!(record.map(|r| r.wave_id), Some(Some(wave)));
        assert!(store.record_growth(repo.id, Some(wave), 3, now).await.unwrap().is_none());

        let stored = store.find_by_id(repo.id).await.unwrap().unwrap();
        assert_eq!(stored.email_count, 3);
        assert_eq!(stored.growth_history.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_repository() {
        let store = MemoryRepositoryStore::new();
        let err = store
            .record_growth(RepositoryId::new(), None, 1, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, snowball_core::error::ErrorKind::NotFound);
    }
}
