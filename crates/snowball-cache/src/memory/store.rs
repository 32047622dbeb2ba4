//! moka-backed cache with per-entry expiry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use snowball_core::config::CacheConfig;
use snowball_core::result::AppResult;
use snowball_core::traits::cache::CacheProvider;

#[derive(Debug, Clone)]
struct Entry {
    raw: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct WrittenTtl;

impl Expiry<String, Entry> for WrittenTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process cache provider.
///
/// `max_ttl_seconds` caps every entry; a shorter TTL given to
/// [`CacheProvider::set`] wins.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    entries: Cache<String, Entry>,
}

impl MemoryCacheProvider {
    /// Build the cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.max_ttl_seconds))
            .expire_after(WrittenTtl)
            .build();
        Self { entries }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.raw))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let entry = Entry {
            raw: value.to_string(),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}
