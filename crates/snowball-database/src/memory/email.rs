//! In-memory member email store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use snowball_core::result::AppResult;
use snowball_core::types::id::{JobId, RepositoryId, UserId};
use snowball_entity::email::{EmailEntry, VerificationStatus};
use snowball_entity::network::ContributorStat;

use crate::store::EmailStore;

type EntryKey = (RepositoryId, String);

/// In-memory member store keyed by `(repository_id, address)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryEmailStore {
    entries: Arc<Mutex<HashMap<EntryKey, EmailEntry>>>,
}

impl MemoryEmailStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmailStore for MemoryEmailStore {
    async fn insert_if_absent(&self, entry: &EmailEntry) -> AppResult<bool> {
        let mut entries = self.entries.lock().await;
        let key = (entry.repository_id, entry.address.clone());
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, entry.clone());
        Ok(true)
    }

    async fn find(
        &self,
        repository_id: RepositoryId,
        address: &str,
    ) -> AppResult<Option<EmailEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&(repository_id, address.to_string())).cloned())
    }

    async fn existing_addresses(
        &self,
        repository_id: RepositoryId,
        addresses: &[String],
    ) -> AppResult<HashSet<String>> {
        let entries = self.entries.lock().await;
        Ok(addresses
            .iter()
            .filter(|a| entries.contains_key(&(repository_id, (*a).clone())))
            .cloned()
            .collect())
    }

    async fn list_by_wave(
        &self,
        repository_id: RepositoryId,
        wave_id: JobId,
    ) -> AppResult<Vec<EmailEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .values()
            .filter(|e| e.repository_id == repository_id && e.wave_id == Some(wave_id))
            .cloned()
            .collect())
    }

    async fn list_by_repository(&self, repository_id: RepositoryId) -> AppResult<Vec<EmailEntry>> {
        let entries = self.entries.lock().await;
        let mut members: Vec<EmailEntry> = entries
            .values()
            .filter(|e| e.repository_id == repository_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.added_at.cmp(&b.added_at));
        Ok(members)
    }

    async fn set_verification(
        &self,
        repository_id: RepositoryId,
        address: &str,
        status: VerificationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(&(repository_id, address.to_string())) {
            Some(entry) => {
                entry.verification_status = status;
                entry.verified_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn top_contributors(
        &self,
        repository_id: RepositoryId,
        limit: i64,
    ) -> AppResult<Vec<ContributorStat>> {
        let entries = self.entries.lock().await;
        let mut counts: HashMap<UserId, i64> = HashMap::new();
        for contributor in entries
            .values()
            .filter(|e| e.repository_id == repository_id)
            .filter_map(|e| e.contributor_id)
        {
            *counts.entry(contributor).or_insert(0) += 1;
        }
        let mut ranked: Vec<ContributorStat> = counts
            .into_iter()
            .map(|(user_id, emails_contributed)| ContributorStat {
                user_id,
                emails_contributed,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.emails_contributed
                .cmp(&a.emails_contributed)
                .then(a.user_id.cmp(&b.user_id))
        });
        ranked.truncate(limit.max(0) as usize);
        Ok(ranked)
    }

    async fn average_quality(
        &self,
        repository_id: RepositoryId,
        status: VerificationStatus,
    ) -> AppResult<f64> {
        let entries = self.entries.lock().await;
        let scores: Vec<f64> = entries
            .values()
            .filter(|e| e.repository_id == repository_id && e.verification_status == status)
            .map(|e| e.quality_score)
            .collect();
        if scores.is_empty() {
            return Ok(0.0);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(repository_id: RepositoryId, address: &str, contributor: Option<UserId>) -> EmailEntry {
        EmailEntry {
            address: address.to_string(),
            repository_id,
            name: None,
            source: "csv_upload".to_string(),
            tags: Vec::new(),
            quality_score: 0.8,
            verification_status: VerificationStatus::Pending,
            snowball_depth: 0,
            contributor_id: contributor,
            wave_id: None,
            added_at: Utc::now(),
            verified_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_if_absent_is_unique_per_repository() {
        let store = MemoryEmailStore::new();
        let repo_a = RepositoryId::new();
        let repo_b = RepositoryId::new();
        assert!(store.insert_if_absent(&entry(repo_a, "a@x.org", None)).await.unwrap());
        assert!(!store.insert_if_absent(&entry(repo_a, "a@x.org", None)).await.unwrap());
        assert!(store.insert_if_absent(&entry(repo_b, "a@x.org", None)).await.unwrap());

        let existing = store
            .existing_addresses(repo_a, &["a@x.org".to_string(), "b@x.org".to_string()])
            .await
            .unwrap();
        assert_eq!(existing.len(), 1);
        assert!(existing.contains("a@x.org"));
    }

    #[tokio::test]
    async fn test_list_by_wave() {
        let store = MemoryEmailStore::new();
        let repo = RepositoryId::new();
        let wave = JobId::new();
        let mut from_wave = entry(repo, "a@x.org", None);
        from_wave.wave_id = Some(wave);
        store.insert_if_absent(&from_wave).await.unwrap();
        store.insert_if_absent(&entry(repo, "b@x.org", None)).await.unwrap();

        let listed = store.list_by_wave(repo, wave).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].address, "a@x.org");
        assert!(store.list_by_wave(RepositoryId::new(), wave).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verification_and_average() {
        let store = MemoryEmailStore::new();
        let repo = RepositoryId::new();
        store.insert_if_absent(&entry(repo, "a@x.org", None)).await.unwrap();
        assert_eq!(
            store.average_quality(repo, VerificationStatus::Active).await.unwrap(),
            0.0
        );
        assert!(
            store
                .set_verification(repo, "a@x.org", VerificationStatus::Active, Utc::now())
                .await
                .unwrap()
        );
        assert!(
            !store
                .set_verification(repo, "missing@x.org", VerificationStatus::Active, Utc::now())
                .await
                .unwrap()
        );
        let avg = store.average_quality(repo, VerificationStatus::Active).await.unwrap();
        assert!((avg - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_top_contributors_ranked() {
        let store = MemoryEmailStore::new();
        let repo = RepositoryId::new();
        let alice = UserId::new();
        let bob = UserId::new();
        for address in ["1@x.org", "2@x.org"] {
            store.insert_if_absent(&entry(repo, address, Some(alice))).await.unwrap();
        }
        store.insert_if_absent(&entry(repo, "3@x.org", Some(bob))).await.unwrap();
        store.insert_if_absent(&entry(repo, "4@x.org", None)).await.unwrap();

        let top = store.top_contributors(repo, 5).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user_id, alice);
        assert_eq!(top[0].emails_contributed, 2);
    }
}
