//! Cache manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use snowball_core::config::CacheConfig;
use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::traits::cache::CacheProvider;

use crate::memory::MemoryCacheProvider;

/// Cheaply clonable handle on the configured cache backend.
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<dyn CacheProvider>,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    pub fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheProvider> = match config.provider.as_str() {
            "memory" => {
                info!(max_capacity = config.max_capacity, "Using in-memory cache");
                Arc::new(MemoryCacheProvider::new(config))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory"
                )));
            }
        };
        Ok(Self { inner })
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_through_manager() {
        let manager = CacheManager::new(&CacheConfig::default()).unwrap();
        manager
            .set_json("snowball:test", &vec![1, 2, 3], Duration::from_secs(5))
            .await
            .unwrap();
        let value: Option<Vec<i32>> = manager.get_json("snowball:test").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_an_error() {
        let manager = CacheManager::new(&CacheConfig::default()).unwrap();
        manager
            .set("snowball:test", "not json", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(manager.get_json::<Vec<i32>>("snowball:test").await.is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = CacheConfig {
            provider: "redis".to_string(),
            ..CacheConfig::default()
        };
        assert!(CacheManager::new(&config).is_err());
    }
}
