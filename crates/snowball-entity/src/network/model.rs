//! Network analysis snapshot model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use snowball_core::types::id::{RepositoryId, UserId};

/// Emails contributed to a repository by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStat {
    /// Contributing user.
    pub user_id: UserId,
    /// Member emails attributed to the user.
    pub emails_contributed: i64,
}

/// Reach and engagement summary of a repository, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAnalysisSnapshot {
    /// Analyzed repository.
    pub repository_id: RepositoryId,
    /// Members plus distinct reachable contacts of opted-in members.
    pub total_reach: i64,
    /// Mean quality score of verified members.
    pub avg_engagement: f64,
    /// Largest contributors, descending.
    pub top_contributors: Vec<ContributorStat>,
    /// Growth rate at analysis time.
    pub growth_rate: f64,
    /// When the snapshot was computed.
    pub analyzed_at: DateTime<Utc>,
}
