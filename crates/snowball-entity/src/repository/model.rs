//! Repository entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use snowball_core::types::id::{RepositoryId, UserId};

use super::growth::GrowthRecord;

/// Size limits of a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RepositoryLimits {
    /// Maximum number of member emails; unlimited when `None`.
    pub max_emails: Option<i64>,
}

/// A named, owned collection of email addresses grouped by topic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Repository {
    /// Unique repository identifier.
    pub id: RepositoryId,
    /// Owning user.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Domains that earn the trusted-domain score component.
    pub trusted_domains: Vec<String>,
    /// Domains whose addresses are always rejected.
    pub blocked_domains: Vec<String>,
    /// Addresses that are always rejected.
    pub blacklist: Vec<String>,
    /// Current number of member emails.
    pub email_count: i64,
    /// Growth rate computed by the last batch.
    pub growth_rate: f64,
    /// Append-only growth log, oldest first.
    #[sqlx(skip)]
    pub growth_history: Vec<GrowthRecord>,
    /// Size limits.
    #[sqlx(flatten)]
    pub limits: RepositoryLimits,
    /// When the repository was created.
    pub created_at: DateTime<Utc>,
    /// When the repository was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    /// Create an empty repository.
    pub fn new(owner_id: UserId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: RepositoryId::new(),
            owner_id,
            name: name.into(),
            trusted_domains: Vec::new(),
            blocked_domains: Vec::new(),
            blacklist: Vec::new(),
            email_count: 0,
            growth_rate: 0.0,
            growth_history: Vec::new(),
            limits: RepositoryLimits::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if `domain` is trusted (case-insensitive).
    pub fn is_trusted_domain(&self, domain: &str) -> bool {
        contains_ignore_case(&self.trusted_domains, domain)
    }

    /// Check if `domain` is blocked (case-insensitive).
    pub fn is_blocked_domain(&self, domain: &str) -> bool {
        contains_ignore_case(&self.blocked_domains, domain)
    }

    /// Check if `address` is blacklisted (case-insensitive).
    pub fn is_blacklisted(&self, address: &str) -> bool {
        contains_ignore_case(&self.blacklist, address)
    }

    /// Number of emails that can still be added, if the repository is capped.
    pub fn remaining_capacity(&self) -> Option<i64> {
        self.limits
            .max_emails
            .map(|max| max.saturating_sub(self.email_count).max(0))
    }

    /// Fractional days since creation.
    pub fn days_active(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_seconds() as f64 / 86_400.0
    }
}

fn contains_ignore_case(values: &[String], needle: &str) -> bool {
    let needle = needle.trim();
    values.iter().any(|v| v.trim().eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_checks_ignore_case() {
        let mut repo = Repository::new(UserId::new(), "rust-news", Utc::now());
        repo.trusted_domains = vec!["Trusted.org".to_string()];
        repo.blocked_domains = vec!["spam.biz".to_string()];
        repo.blacklist = vec!["Bad@Example.com".to_string()];
        assert!(repo.is_trusted_domain("trusted.org"));
        assert!(repo.is_blocked_domain("SPAM.BIZ"));
        assert!(repo.is_blacklisted("bad@example.com"));
        assert!(!repo.is_trusted_domain("example.com"));
    }

    #[test]
    fn test_remaining_capacity() {
        let mut repo = Repository::new(UserId::new(), "r", Utc::now());
        assert_eq!(repo.remaining_capacity(), None);
        repo.limits.max_emails = Some(10);
        repo.email_count = 7;
        assert_eq!(repo.remaining_capacity(), Some(3));
        repo.email_count = 12;
        assert_eq!(repo.remaining_capacity(), Some(0));
    }

    #[test]
    fn test_days_active() {
        let now = Utc::now();
        let repo = Repository::new(UserId::new(), "r", now - chrono::Duration::hours(36));
        assert!((repo.days_active(now) - 1.5).abs() < 1e-9);
    }
}
