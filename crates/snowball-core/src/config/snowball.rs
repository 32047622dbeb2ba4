//! Snowball distribution and quality scoring configuration.

use serde::{Deserialize, Serialize};

/// Hard cap on recursive distribution depth.
pub const MAX_DEPTH: u32 = 3;

/// Minimum composite score for a candidate to be admitted.
pub const QUALITY_THRESHOLD: f64 = 0.7;

/// Snowball fan-out, scoring, and analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowballConfig {
    /// Maximum recursion depth; a job at this depth never spawns children.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Acceptance threshold for the quality score (inclusive).
    #[serde(default = "default_threshold")]
    pub quality_threshold: f64,
    /// Upper bound of the random delay added to each verification job.
    #[serde(default = "default_jitter")]
    pub verification_jitter_max_ms: u64,
    /// Length of one delay unit; a child at depth `d` waits `d` units.
    #[serde(default = "default_depth_delay")]
    pub depth_delay_seconds: u64,
    /// Lifetime of a cached network analysis snapshot.
    #[serde(default = "default_snapshot_ttl")]
    pub network_snapshot_ttl_seconds: u64,
    /// Number of contributors reported in a network snapshot.
    #[serde(default = "default_top_contributors")]
    pub top_contributors: usize,
}

impl Default for SnowballConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            quality_threshold: default_threshold(),
            verification_jitter_max_ms: default_jitter(),
            depth_delay_seconds: default_depth_delay(),
            network_snapshot_ttl_seconds: default_snapshot_ttl(),
            top_contributors: default_top_contributors(),
        }
    }
}

fn default_max_depth() -> u32 {
    MAX_DEPTH
}

fn default_threshold() -> f64 {
    QUALITY_THRESHOLD
}

fn default_jitter() -> u64 {
    5000
}

fn default_depth_delay() -> u64 {
    60
}

fn default_snapshot_ttl() -> u64 {
    3600
}

fn default_top_contributors() -> usize {
    5
}
