//! Network analyzer: reach, engagement and top contributors of a repository.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use snowball_cache::{CacheManager, keys};
use snowball_core::config::SnowballConfig;
use snowball_core::error::{AppError, ErrorKind};
use snowball_core::result::AppResult;
use snowball_core::traits::cache::CacheProvider;
use snowball_core::types::id::RepositoryId;
use snowball_database::DataStore;
use snowball_entity::email::VerificationStatus;
use snowball_entity::network::NetworkAnalysisSnapshot;

use crate::csv::{normalize_address, parse_contacts};
use crate::csv::validator::is_valid_format;
use crate::quality::scorer::round_score;

/// Computes and caches [`NetworkAnalysisSnapshot`]s.
#[derive(Debug, Clone)]
pub struct NetworkAnalyzer {
    store: DataStore,
    cache: CacheManager,
    snapshot_ttl: Duration,
    top_contributors: usize,
}

impl NetworkAnalyzer {
    /// Create a new analyzer.
    pub fn new(store: DataStore, cache: CacheManager, config: &SnowballConfig) -> Self {
        Self {
            store,
            cache,
            snapshot_ttl: Duration::from_secs(config.network_snapshot_ttl_seconds),
            top_contributors: config.top_contributors,
        }
    }

    /// Return the snapshot of a repository, recomputing it when `force` is
    /// set or no cached snapshot exists.
    pub async fn analyze(
        &self,
        repository_id: RepositoryId,
        force: bool,
    ) -> AppResult<NetworkAnalysisSnapshot> {
        let key = keys::network_snapshot(repository_id);
        if !force {
            match self.cache.get_json::<NetworkAnalysisSnapshot>(&key).await {
                Ok(Some(snapshot)) => {
                    debug!(repository_id = %repository_id, "Network snapshot cache hit");
                    return Ok(snapshot);
                }
                Ok(None) => {}
                Err(e) => warn!(repository_id = %repository_id, error = %e, "Ignoring unreadable cached snapshot"),
            }
        }

        let snapshot = match self.compute(repository_id).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.kind == ErrorKind::NotFound => {
                self.cache.delete(&key).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        self.cache.set_json(&key, &snapshot, self.snapshot_ttl).await?;
        info!(
            repository_id = %repository_id,
            total_reach = snapshot.total_reach,
            avg_engagement = snapshot.avg_engagement,
            "Network snapshot computed"
        );
        Ok(snapshot)
    }

    async fn compute(&self, repository_id: RepositoryId) -> AppResult<NetworkAnalysisSnapshot> {
        let repository = self
            .store
            .repositories
            .find_by_id(repository_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Repository {repository_id} not found")))?;

        let members = self.store.emails.list_by_repository(repository_id).await?;
        let member_addresses: HashSet<&str> = members.iter().map(|m| m.address.as_str()).collect();

        let mut reachable: HashSet<String> = HashSet::new();
        for member in &members {
            let Some(user) = self.store.users.find_by_email(&member.address).await? else {
                continue;
            };
            if !user.allows_snowball() {
                continue;
            }
            for list in self.store.users.contact_lists_for(user.id).await? {
                let rows = match parse_contacts(&list.csv_payload) {
                    Ok(rows) => rows,
                    Err(e) => {
                        debug!(contact_list_id = %list.id, error = %e, "Skipping unreadable contact list");
                        continue;
                    }
                };
                for row in rows {
                    let address = normalize_address(&row.email);
                    if is_valid_format(&address) && !member_addresses.contains(address.as_str()) {
                        reachable.insert(address);
                    }
                }
            }
        }

        let avg_engagement = round_score(
            self.store
                .emails
                .average_quality(repository_id, VerificationStatus::Active)
                .await?,
        );
        let top_contributors = self
            .store
            .emails
            .top_contributors(repository_id, self.top_contributors as i64)
            .await?;

        Ok(NetworkAnalysisSnapshot {
            repository_id,
            total_reach: (members.len() + reachable.len()) as i64,
            avg_engagement,
            top_contributors,
            growth_rate: repository.growth_rate,
            analyzed_at: Utc::now(),
        })
    }
}
