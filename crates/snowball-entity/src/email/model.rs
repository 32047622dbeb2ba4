//! Email entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use snowball_core::types::id::{JobId, RepositoryId, UserId};

/// Deliverability status of a member email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "verification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Awaiting the verification job.
    Pending,
    /// Verified deliverable.
    Active,
    /// Verified undeliverable.
    Invalid,
}

impl VerificationStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A member address of a repository. `(address, repository_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailEntry {
    /// Normalized (trimmed, lower-case) address.
    pub address: String,
    /// Owning repository.
    pub repository_id: RepositoryId,
    /// Contact name from the upload.
    pub name: Option<String>,
    /// Origin of the address (e.g., `"verified_user"`, `"csv_upload"`).
    pub source: String,
    /// Free-form tags from the upload.
    pub tags: Vec<String>,
    /// Composite quality score in `[0, 1]`.
    pub quality_score: f64,
    /// Deliverability status.
    pub verification_status: VerificationStatus,
    /// Snowball depth of the wave that added the address.
    pub snowball_depth: i32,
    /// User whose upload contributed the address.
    pub contributor_id: Option<UserId>,
    /// `process-csv` job that added the address.
    pub wave_id: Option<JobId>,
    /// When the address was added.
    pub added_at: DateTime<Utc>,
    /// When verification finished.
    pub verified_at: Option<DateTime<Utc>>,
}

impl EmailEntry {
    /// Domain part of the address.
    pub fn domain(&self) -> &str {
        domain_of(&self.address)
    }
}

/// Domain part of an address (everything after the last `@`).
pub fn domain_of(address: &str) -> &str {
    address.rsplit_once('@').map(|(_, d)| d).unwrap_or("")
}
