//! Domain reputation entry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached reputation score for a mail domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainReputationEntry {
    /// Lower-case domain.
    pub domain: String,
    /// Score in `[0, 1]`.
    pub score: f64,
    /// When the entry must be recomputed.
    pub expires_at: DateTime<Utc>,
}

impl DomainReputationEntry {
    /// Create an entry valid for `ttl` from `now`. The score is clamped into `[0, 1]`.
    pub fn new(domain: impl Into<String>, score: f64, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            domain: domain.into(),
            score: clamp_score(score),
            expires_at: now + ttl,
        }
    }

    /// Check if the entry is stale at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Clamp a score into `[0, 1]`; non-finite values become 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_score(1.7), 1.0);
        assert_eq!(clamp_score(-0.2), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(0.42), 0.42);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let entry = DomainReputationEntry::new("example.org", 0.5, Duration::hours(24), now);
        assert!(!entry.is_expired(now));
        assert!(entry.is_expired(now + Duration::hours(24)));
    }
}
