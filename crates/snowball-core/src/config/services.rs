//! External collaborator configuration (reputation, verification, notification).

use serde::{Deserialize, Serialize};

/// Domain reputation lookup and cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Base URL of the reputation service. `None` scores every domain 0.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Lifetime of a cached reputation score.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    /// Maximum number of cached domains.
    #[serde(default = "default_cache_capacity")]
    pub cache_max_capacity: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_timeout(),
            cache_ttl_hours: default_cache_ttl_hours(),
            cache_max_capacity: default_cache_capacity(),
        }
    }
}

/// Email verification service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Base URL of the verification service. `None` accepts every address.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_timeout(),
        }
    }
}

/// Owner notification transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Base URL of the notification gateway. `None` only logs notifications.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_cache_capacity() -> u64 {
    100_000
}
