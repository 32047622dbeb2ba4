//! Typed job payload definitions.
//!
//! Payloads are stored as JSON tagged with `type`; decoding into
//! [`JobPayload`] is the validation boundary for every handler.

use serde::{Deserialize, Serialize};

use snowball_core::types::id::{ContactListId, RepositoryId, UserId};
use snowball_core::types::queue;

use crate::user::model::DigestFrequency;

/// Parameters of one snowball wave: ingest a CSV into a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCsvPayload {
    /// Target repository.
    pub repository_id: RepositoryId,
    /// Raw CSV text, header row first.
    pub csv_payload: String,
    /// User whose upload this is.
    pub user_id: UserId,
    /// Recursion depth; 0 for a direct upload.
    pub depth: u32,
    /// Source assigned to rows without a `source` column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Contact list this payload was read from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_list_id: Option<ContactListId>,
}

/// Deliverability check of one accepted address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailPayload {
    /// Address to verify.
    pub email: String,
    /// Repository holding the entry.
    pub repository_id: RepositoryId,
}

/// Network snapshot recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeNetworkPayload {
    /// Repository to analyze.
    pub repository_id: RepositoryId,
}

/// Digest delivery for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestPayload {
    /// Repository to summarize.
    pub repository_id: RepositoryId,
    /// Digest window.
    pub frequency: DigestFrequency,
}

/// Typed payloads for known job types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JobPayload {
    /// Validate, score, and persist a CSV; possibly spawn the next wave.
    ProcessCsv(ProcessCsvPayload),
    /// Verify one accepted address.
    VerifyEmail(VerifyEmailPayload),
    /// Recompute and cache a network snapshot.
    AnalyzeNetwork(AnalyzeNetworkPayload),
    /// Enqueue one digest per repository whose owner wants this frequency.
    DispatchDigests {
        /// Digest window.
        frequency: DigestFrequency,
    },
    /// Deliver one repository digest.
    SendDigest(DigestPayload),
    /// Purge old completed (and optionally failed) jobs.
    Cleanup,
    /// Enqueue depth-0 jobs for pending contact lists.
    SnowballSweep,
}

impl JobPayload {
    /// Job type identifier stored alongside the payload.
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::ProcessCsv(_) => "process-csv",
            Self::VerifyEmail(_) => "verify-email",
            Self::AnalyzeNetwork(_) => "analyze-network",
            Self::DispatchDigests { .. } => "dispatch-digests",
            Self::SendDigest(_) => "send-digest",
            Self::Cleanup => "cleanup",
            Self::SnowballSweep => "snowball-sweep",
        }
    }

    /// Queue a payload is routed to when the enqueuer does not choose one.
    pub fn default_queue(&self) -> &'static str {
        match self {
            Self::ProcessCsv(params) if params.depth == 0 => queue::EMAIL_PROCESSING,
            Self::ProcessCsv(_) => queue::SNOWBALL_DISTRIBUTION,
            Self::VerifyEmail(_) => queue::EMAIL_PROCESSING,
            Self::AnalyzeNetwork(_) | Self::SnowballSweep => queue::SNOWBALL_DISTRIBUTION,
            Self::DispatchDigests { .. } | Self::SendDigest(_) => queue::DIGEST_GENERATION,
            Self::Cleanup => queue::DATA_CLEANUP,
        }
    }

    /// Snowball depth carried by the payload, if any.
    pub fn depth(&self) -> Option<u32> {
        match self {
            Self::ProcessCsv(params) => Some(params.depth),
            _ => None,
        }
    }
}
