//! Append-only growth log entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use snowball_core::types::id::JobId;

/// One batch of additions to a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GrowthRecord {
    /// When the batch was recorded.
    pub date: DateTime<Utc>,
    /// Emails added by the batch.
    pub count_added: i64,
    /// Repository size after the batch.
    pub total: i64,
    /// Wave that recorded the batch; at most one record per wave.
    pub wave_id: Option<JobId>,
}
