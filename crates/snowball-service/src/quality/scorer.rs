//! Quality scorer.
//!
//! `score = 0.3·[trusted domain] + 0.4·[source == "verified_user"] + 0.3·reputation`,
//! clipped to `[0, 1]` and rounded to four decimals. A candidate is accepted
//! when its score reaches the threshold (inclusive).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::DomainReputationService;
use snowball_entity::email::model::domain_of;
use snowball_entity::reputation::model::clamp_score;
use snowball_entity::repository::Repository;

/// Weight of the trusted-domain factor.
pub const TRUSTED_DOMAIN_WEIGHT: f64 = 0.3;
/// Weight of the verified-source factor.
pub const VERIFIED_SOURCE_WEIGHT: f64 = 0.4;
/// Weight of the domain reputation factor.
pub const REPUTATION_WEIGHT: f64 = 0.3;
/// Source value that earns the verified-source factor.
pub const VERIFIED_USER_SOURCE: &str = "verified_user";

/// Breakdown of one candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Domain is in the repository's trusted list.
    pub trusted_domain: bool,
    /// Source is `verified_user`.
    pub verified_source: bool,
    /// Clamped domain reputation.
    pub reputation: f64,
    /// Composite score in `[0, 1]`.
    pub total: f64,
}

/// Round a score to four decimal places.
pub fn round_score(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Combine the three factors into a score in `[0, 1]`.
pub fn compute_score(trusted_domain: bool, verified_source: bool, reputation: f64) -> f64 {
    let mut score = REPUTATION_WEIGHT * clamp_score(reputation);
    if trusted_domain {
        score += TRUSTED_DOMAIN_WEIGHT;
    }
    if verified_source {
        score += VERIFIED_SOURCE_WEIGHT;
    }
    round_score(score.clamp(0.0, 1.0))
}

/// Scores candidates against a repository using the reputation lookup.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    reputation: Arc<dyn DomainReputationService>,
    threshold: f64,
}

impl QualityScorer {
    /// Create a scorer with an acceptance threshold.
    pub fn new(reputation: Arc<dyn DomainReputationService>, threshold: f64) -> Self {
        Self {
            reputation,
            threshold,
        }
    }

    /// Acceptance threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score a normalized address. Reputation lookup failures propagate.
    pub async fn score(
        &self,
        address: &str,
        source: &str,
        repository: &Repository,
    ) -> AppResult<QualityScore> {
        let domain = domain_of(address);
        let trusted_domain = repository.is_trusted_domain(domain);
        let verified_source = source == VERIFIED_USER_SOURCE;
        let reputation = clamp_score(self.reputation.check(domain).await?);

        Ok(QualityScore {
            trusted_domain,
            verified_source,
            reputation,
            total: compute_score(trusted_domain, verified_source, reputation),
        })
    }

    /// Check if a score meets the threshold.
    pub fn accepts(&self, score: &QualityScore) -> bool {
        score.total >= self.threshold
    }
}
