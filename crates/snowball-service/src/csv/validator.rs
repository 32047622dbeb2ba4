//! Per-row address validation: format, repository policy and spam heuristics.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use snowball_entity::email::model::domain_of;
use snowball_entity::repository::Repository;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$")
        .expect("email pattern compiles")
});

static SPAM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"test\d+@",
        r"no-?reply@",
        r"admin@",
        r"^postmaster@",
        r"^mailer-daemon@",
        r"\+spam",
        r"^spam@",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("spam pattern compiles"))
    .collect()
});

/// Why a candidate row was not added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Empty or syntactically invalid address.
    Malformed,
    /// Address is on the repository blacklist.
    Blacklisted,
    /// Domain is blocked by the repository.
    BlockedDomain,
    /// Address matches a spam heuristic.
    Spam,
    /// Already a member, or repeated within the upload.
    Duplicate,
    /// Quality score below the acceptance threshold.
    LowQuality,
    /// Repository reached its size limit.
    LimitReached,
}

impl SkipReason {
    /// Return the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Blacklisted => "blacklisted",
            Self::BlockedDomain => "blocked_domain",
            Self::Spam => "spam",
            Self::Duplicate => "duplicate",
            Self::LowQuality => "low_quality",
            Self::LimitReached => "limit_reached",
        }
    }

    /// Whether the reason is a quality rejection rather than a skip.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::LowQuality)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trim and lower-case an uploaded address.
pub fn normalize_address(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Check if a normalized address is syntactically valid.
pub fn is_valid_format(address: &str) -> bool {
    address.len() <= 254 && EMAIL_RE.is_match(address)
}

/// Check if a normalized address matches a spam heuristic.
pub fn is_spam(address: &str) -> bool {
    SPAM_PATTERNS.iter().any(|re| re.is_match(address))
}

/// Validate a normalized address against format, repository policy and
/// spam heuristics, in that order.
pub fn validate_address(address: &str, repository: &Repository) -> Result<(), SkipReason> {
    if address.is_empty() || !is_valid_format(address) {
        return Err(SkipReason::Malformed);
    }
    if repository.is_blacklisted(address) {
        return Err(SkipReason::Blacklisted);
    }
    if repository.is_blocked_domain(domain_of(address)) {
        return Err(SkipReason::BlockedDomain);
    }
    if is_spam(address) {
        return Err(SkipReason::Spam);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use snowball_core::types::id::UserId;

    use super::*;

    fn repository() -> Repository {
        let mut repo = Repository::new(UserId::new(), "r", Utc::now());
        repo.blacklist = vec!["Banned@Example.org".to_string()];
        repo.blocked_domains = vec!["spam.biz".to_string()];
        repo
    }

    #[test]
    fn test_format() {
        assert!(is_valid_format("alice@trusted.org"));
        assert!(is_valid_format("first.last+news@sub.example.co.uk"));
        assert!(!is_valid_format("bad-email"));
        assert!(!is_valid_format("a@b"));
        assert!(!is_valid_format("a b@c.org"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_address("  Alice@Trusted.ORG "), "alice@trusted.org");
    }

    #[test]
    fn test_policy_order() {
        let repo = repository();
        assert_eq!(validate_address("", &repo), Err(SkipReason::Malformed));
        assert_eq!(
            validate_address("banned@example.org", &repo),
            Err(SkipReason::Blacklisted)
        );
        assert_eq!(
            validate_address("bob@spam.biz", &repo),
            Err(SkipReason::BlockedDomain)
        );
        assert_eq!(validate_address("test42@x.org", &repo), Err(SkipReason::Spam));
        assert_eq!(validate_address("noreply@x.org", &repo), Err(SkipReason::Spam));
        assert_eq!(validate_address("admin@x.org", &repo), Err(SkipReason::Spam));
        assert_eq!(validate_address("me+spam@x.org", &repo), Err(SkipReason::Spam));
        assert_eq!(validate_address("qa.test12@x.com", &repo), Err(SkipReason::Spam));
        assert_eq!(validate_address("sysadmin@x.com", &repo), Err(SkipReason::Spam));
        assert_eq!(validate_address("team.noreply@x.com", &repo), Err(SkipReason::Spam));
        assert_eq!(validate_address("carol@x.org", &repo), Ok(()));
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&SkipReason::BlockedDomain).unwrap();
        assert_eq!(json, "\"blocked_domain\"");
    }
}
