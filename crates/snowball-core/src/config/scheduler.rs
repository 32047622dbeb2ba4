//! Recurring job schedule configuration.
//!
//! Cron expressions use the six-field form with a leading seconds column.

use serde::{Deserialize, Serialize};

/// Cron expressions for the built-in recurring jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether recurring jobs are registered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Completed-job purge.
    #[serde(default = "default_cleanup")]
    pub cleanup_cron: String,
    /// Daily digest dispatch.
    #[serde(default = "default_daily_digest")]
    pub daily_digest_cron: String,
    /// Weekly digest dispatch.
    #[serde(default = "default_weekly_digest")]
    pub weekly_digest_cron: String,
    /// Sweep of pending snowball-eligible contact lists.
    #[serde(default = "default_snowball_sweep")]
    pub snowball_sweep_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            cleanup_cron: default_cleanup(),
            daily_digest_cron: default_daily_digest(),
            weekly_digest_cron: default_weekly_digest(),
            snowball_sweep_cron: default_snowball_sweep(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cleanup() -> String {
    "0 0 2 * * *".to_string()
}

fn default_daily_digest() -> String {
    "0 0 8 * * *".to_string()
}

fn default_weekly_digest() -> String {
    "0 0 8 * * Mon".to_string()
}

fn default_snowball_sweep() -> String {
    "0 0 3 * * Sun".to_string()
}
