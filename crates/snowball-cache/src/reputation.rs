//! TTL cache fronting the external domain reputation lookup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use tracing::debug;

use snowball_core::config::ReputationConfig;
use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::DomainReputationService;
use snowball_entity::reputation::DomainReputationEntry;

/// Domain reputation cache.
///
/// Scores are cached per lower-cased domain for the configured TTL (24h by
/// default). Concurrent misses for one domain share a single upstream
/// lookup; a failed lookup is not cached and is returned to every waiter.
#[derive(Debug, Clone)]
pub struct ReputationCache {
    entries: Cache<String, DomainReputationEntry>,
    upstream: Arc<dyn DomainReputationService>,
    ttl: chrono::Duration,
}

impl ReputationCache {
    /// Create a cache in front of `upstream`.
    pub fn new(config: &ReputationConfig, upstream: Arc<dyn DomainReputationService>) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_hours.saturating_mul(3600));
        Self::with_ttl(upstream, ttl, config.cache_max_capacity)
    }

    /// Create a cache with an explicit TTL.
    pub fn with_ttl(
        upstream: Arc<dyn DomainReputationService>,
        ttl: Duration,
        max_capacity: u64,
    ) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self {
            entries,
            upstream,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(24)),
        }
    }

    /// Return the reputation score of `domain` in `[0, 1]`.
    pub async fn get_reputation(&self, domain: &str) -> AppResult<f64> {
        let domain = domain.trim().to_lowercase();

        if let Some(entry) = self.entries.get(&domain).await {
            if !entry.is_expired(Utc::now()) {
                return Ok(entry.score);
            }
            self.entries.invalidate(&domain).await;
        }

        let upstream = Arc::clone(&self.upstream);
        let ttl = self.ttl;
        let key = domain.clone();
        let entry = self
            .entries
            .try_get_with(domain, async move {
                debug!(domain = %key, "Reputation cache miss");
                let score = upstream.check(&key).await?;
                Ok::<_, AppError>(DomainReputationEntry::new(key, score, ttl, Utc::now()))
            })
            .await
            .map_err(|e| (*e).clone())?;
        Ok(entry.score)
    }

    /// Drop every cached score.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

#[async_trait]
impl DomainReputationService for ReputationCache {
    async fn check(&self, domain: &str) -> AppResult<f64> {
        self.get_reputation(domain).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct CountingService {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DomainReputationService for CountingService {
        async fn check(&self, domain: &str) -> AppResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(AppError::external("reputation service down"));
            }
            Ok(if domain == "good.org" { 0.9 } else { 1.7 })
        }
    }

    #[tokio::test]
    async fn test_hit_after_miss() {
        let service = Arc::new(CountingService::default());
        let cache = ReputationCache::with_ttl(service.clone(), Duration::from_secs(60), 100);
        assert_eq!(cache.get_reputation("Good.org").await.unwrap(), 0.9);
        assert_eq!(cache.get_reputation("good.org").await.unwrap(), 0.9);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scores_clamped() {
        let service = Arc::new(CountingService::default());
        let cache = ReputationCache::with_ttl(service, Duration::from_secs(60), 100);
        assert_eq!(cache.get_reputation("weird.biz").await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce() {
        let service = Arc::new(CountingService::default());
        let cache = ReputationCache::with_ttl(service.clone(), Duration::from_secs(60), 100);
        let (a, b) = tokio::join!(
            cache.get_reputation("good.org"),
            cache.get_reputation("good.org")
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let service = Arc::new(CountingService {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cache = ReputationCache::with_ttl(service.clone(), Duration::from_secs(60), 100);
        assert!(cache.get_reputation("good.org").await.is_err());
        assert!(cache.get_reputation("good.org").await.is_err());
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputed() {
        let service = Arc::new(CountingService::default());
        let cache = ReputationCache::with_ttl(service.clone(), Duration::from_millis(50), 100);
        cache.get_reputation("good.org").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.get_reputation("good.org").await.unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }
}
