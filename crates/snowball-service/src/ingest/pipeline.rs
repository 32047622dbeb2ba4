//! Ingestion pipeline for one `process-csv` wave.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use snowball_core::error::AppError;
use snowball_core::result::AppResult;
use snowball_core::types::id::JobId;
use snowball_database::store::{EmailStore, RepositoryStore};
use snowball_entity::email::{EmailEntry, VerificationStatus};
use snowball_entity::job::ProcessCsvPayload;
use snowball_entity::repository::Repository;

use crate::csv::{ContactRow, SkipReason, normalize_address, parse_contacts, validate_address};
use crate::quality::QualityScorer;

use super::result::CsvProcessingResult;

/// Source recorded for rows without a `source` column or payload default.
pub const DEFAULT_SOURCE: &str = "csv_upload";

/// Outcome of one ingested upload.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Target repository as loaded before ingestion.
    pub repository: Repository,
    /// Counters.
    pub result: CsvProcessingResult,
    /// Entries persisted by this wave, including those persisted by an
    /// earlier attempt of the same job.
    pub accepted: Vec<EmailEntry>,
}

/// A row that survived validation and deduplication.
struct Candidate {
    address: String,
    row: ContactRow,
}

/// Validates, scores and persists uploaded contact lists.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    repositories: Arc<dyn RepositoryStore>,
    emails: Arc<dyn EmailStore>,
    scorer: QualityScorer,
    max_depth: u32,
}

impl IngestionPipeline {
    /// Create a new pipeline.
    pub fn new(
        repositories: Arc<dyn RepositoryStore>,
        emails: Arc<dyn EmailStore>,
        scorer: QualityScorer,
        max_depth: u32,
    ) -> Self {
        Self {
            repositories,
            emails,
            scorer,
            max_depth,
        }
    }

    /// Process one upload into its repository as wave `wave_id`.
    ///
    /// Rows an earlier attempt of the same wave already persisted count as
    /// added again, so a retried wave still fans out every member it added.
    ///
    /// Fails with `Validation` for depth overflow or an unusable CSV, with
    /// `NotFound` for a missing repository, and with the lookup's error
    /// kind when a store or reputation call fails. Policy rejections are
    /// counted, never returned as errors.
    pub async fn process(
        &self,
        params: &ProcessCsvPayload,
        wave_id: JobId,
    ) -> AppResult<IngestOutcome> {
        if params.depth > self.max_depth {
            return Err(AppError::validation(format!(
                "Snowball depth {} exceeds maximum {}",
                params.depth, self.max_depth
            )));
        }

        let repository = self
            .repositories
            .find_by_id(params.repository_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Repository {} not found", params.repository_id))
            })?;

        let rows = parse_contacts(&params.csv_payload)?;
        let mut result = CsvProcessingResult::default();

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for row in rows {
            result.record_processed();
            let address = normalize_address(&row.email);
            if let Err(reason) = validate_address(&address, &repository) {
                result.record_skip(reason);
                continue;
            }
            if !seen.insert(address.clone()) {
                result.record_skip(SkipReason::Duplicate);
                continue;
            }
            candidates.push(Candidate { address, row });
        }

        let addresses: Vec<String> = candidates.iter().map(|c| c.address.clone()).collect();
        let existing = self
            .emails
            .existing_addresses(repository.id, &addresses)
            .await?;

        let mut resumed: HashMap<String, EmailEntry> = self
            .emails
            .list_by_wave(repository.id, wave_id)
            .await?
            .into_iter()
            .map(|e| (e.address.clone(), e))
            .collect();
        if !resumed.is_empty() {
            debug!(wave_id = %wave_id, resumed = resumed.len(), "Resuming partially persisted wave");
        }

        // Read once per wave; concurrent waves on one repository may overshoot
        // `max_emails` by at most their own batch sizes.
        let mut remaining = repository.remaining_capacity();
        let mut accepted = Vec::new();
        for candidate in candidates {
            if let Some(entry) = resumed.remove(&candidate.address) {
                result.record_added();
                accepted.push(entry);
                continue;
            }
            if existing.contains(&candidate.address) {
                result.record_skip(SkipReason::Duplicate);
                continue;
            }

            let source = candidate
                .row
                .source
                .clone()
                .or_else(|| params.source.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
            let score = self
                .scorer
                .score(&candidate.address, &source, &repository)
                .await?;
            if !self.scorer.accepts(&score) {
                debug!(address = %candidate.address, score = score.total, "Candidate below threshold");
                result.record_skip(SkipReason::LowQuality);
                continue;
            }

            if remaining == Some(0) {
                result.record_skip(SkipReason::LimitReached);
                continue;
            }

            let entry = EmailEntry {
                address: candidate.address,
                repository_id: repository.id,
                name: candidate.row.name,
                source,
                tags: candidate.row.tags,
                quality_score: score.total,
                verification_status: VerificationStatus::Pending,
                snowball_depth: params.depth as i32,
                contributor_id: Some(params.user_id),
                wave_id: Some(wave_id),
                added_at: Utc::now(),
                verified_at: None,
            };

            if self.emails.insert_if_absent(&entry).await? {
                result.record_added();
                remaining = remaining.map(|r| r - 1);
                accepted.push(entry);
            } else {
                result.record_skip(SkipReason::Duplicate);
            }
        }

        info!(
            repository_id = %repository.id,
            depth = params.depth,
            processed = result.processed,
            added = result.added,
            skipped = result.skipped,
            rejected = result.rejected,
            "CSV processed"
        );

        Ok(IngestOutcome {
            repository,
            result,
            accepted,
        })
    }
}
