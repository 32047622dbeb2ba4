//! Job status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Ready to be picked up by a worker.
    Waiting,
    /// Locked by a worker and executing.
    Active,
    /// Handler returned successfully.
    Completed,
    /// Attempts exhausted or failed permanently; retained with the last error.
    Failed,
    /// Waiting for its `run_at` (initial delay or retry backoff).
    Delayed,
    /// Lock expired while active; eligible to be claimed again.
    Stalled,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if a worker may claim a job in this state (once `run_at` has passed).
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Waiting | Self::Delayed | Self::Stalled)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Delayed => "delayed",
            Self::Stalled => "stalled",
        }
    }

    /// All statuses, in lifecycle order.
    pub fn all() -> [Self; 6] {
        [
            Self::Waiting,
            Self::Delayed,
            Self::Active,
            Self::Stalled,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown job status '{s}'"))
    }
}
