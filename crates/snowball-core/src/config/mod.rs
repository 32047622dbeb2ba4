//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so that an empty
//! file yields a runnable single-node setup.

pub mod cache;
pub mod database;
pub mod logging;
pub mod scheduler;
pub mod services;
pub mod snowball;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::cache::CacheConfig;
pub use self::database::{DatabaseConfig, StoreConfig};
pub use self::logging::LoggingConfig;
pub use self::scheduler::SchedulerConfig;
pub use self::services::{NotificationConfig, ReputationConfig, VerificationConfig};
pub use self::snowball::SnowballConfig;
pub use self::worker::{QueueConcurrency, WorkerConfig};

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "SNOWBALL";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data store backend selection.
    #[serde(default)]
    pub store: StoreConfig,
    /// Database connection settings (used by the postgres backend).
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache provider settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Recurring job schedules.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Snowball distribution and scoring settings.
    #[serde(default)]
    pub snowball: SnowballConfig,
    /// Domain reputation service settings.
    #[serde(default)]
    pub reputation: ReputationConfig,
    /// Email verification service settings.
    #[serde(default)]
    pub verification: VerificationConfig,
    /// Owner notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for an environment.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and
    /// environment variables prefixed with `SNOWBALL__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        Self::finish(builder)
    }

    /// Load configuration from an explicit file path plus environment variables.
    pub fn load_from(path: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject settings that would break the worker's invariants.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=1.0).contains(&self.snowball.quality_threshold) {
            return Err(AppError::configuration(format!(
                "snowball.quality_threshold must be within [0, 1], got {}",
                self.snowball.quality_threshold
            )));
        }
        if self.worker.lock_duration_ms < 2 {
            return Err(AppError::configuration(
                "worker.lock_duration_ms must be at least 2",
            ));
        }
        if self.worker.default_attempts < 1 {
            return Err(AppError::configuration(
                "worker.default_attempts must be at least 1",
            ));
        }
        for (queue, concurrency) in self.worker.queues.entries() {
            if concurrency == 0 {
                return Err(AppError::configuration(format!(
                    "worker.queues concurrency for '{queue}' must be positive"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.snowball.max_depth, 3);
        assert_eq!(config.worker.queues.email_processing, 10);
        assert_eq!(config.store.backend, "memory");
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = AppConfig::default();
        config.snowball.quality_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.worker.queues.data_cleanup = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[snowball]\nmax_depth = 2\n[worker.queues]\nsnowball_distribution = 7\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(parsed.snowball.max_depth, 2);
        assert_eq!(parsed.snowball.quality_threshold, 0.7);
        assert_eq!(parsed.worker.queues.snowball_distribution, 7);
        assert_eq!(parsed.worker.queues.digest_generation, 5);
    }
}
