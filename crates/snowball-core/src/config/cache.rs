//! Cache settings.

use serde::{Deserialize, Serialize};

/// Cache for derived data such as network snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend name; `"memory"` is the only built-in one.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Entry bound for the memory backend.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Ceiling on any entry's lifetime, in seconds.
    #[serde(default = "default_max_ttl")]
    pub max_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            max_capacity: default_max_capacity(),
            max_ttl_seconds: default_max_ttl(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_max_ttl() -> u64 {
    86_400
}
