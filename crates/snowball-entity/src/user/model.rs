//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use snowball_core::types::id::UserId;

/// How often a repository owner receives a digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestFrequency {
    /// No digests.
    #[default]
    None,
    /// Every day.
    Daily,
    /// Every week.
    Weekly,
}

impl DigestFrequency {
    /// Length of the window summarized by one digest.
    pub fn window(&self) -> Option<chrono::Duration> {
        match self {
            Self::None => None,
            Self::Daily => Some(chrono::Duration::days(1)),
            Self::Weekly => Some(chrono::Duration::days(7)),
        }
    }

    /// Return the frequency as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for DigestFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences relevant to distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMetadata {
    /// Explicit snowball opt-out when `Some(false)`; unset means allowed.
    pub allow_snowball: Option<bool>,
    /// Notify the user when a repository they own grows.
    pub notify_on_growth: bool,
    /// Digest cadence for repositories the user owns.
    pub digest_frequency: DigestFrequency,
}

/// A registered platform user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Normalized primary address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Karma points.
    pub karma: i64,
    /// Preferences.
    #[sqlx(json)]
    pub metadata: UserMetadata,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with default preferences.
    pub fn new(email: impl Into<String>, display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into().trim().to_lowercase(),
            display_name: display_name.into(),
            karma: 0,
            metadata: UserMetadata::default(),
            created_at: now,
        }
    }

    /// Whether the user's contact lists may seed further snowball waves.
    pub fn allows_snowball(&self) -> bool {
        self.metadata.allow_snowball != Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowball_opt_out_is_explicit() {
        let mut user = User::new("Bob@Example.com", "Bob", Utc::now());
        assert_eq!(user.email, "bob@example.com");
        assert!(user.allows_snowball());
        user.metadata.allow_snowball = Some(true);
        assert!(user.allows_snowball());
        user.metadata.allow_snowball = Some(false);
        assert!(!user.allows_snowball());
    }

    #[test]
    fn test_metadata_defaults_from_empty_json() {
        let metadata: UserMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(metadata, UserMetadata::default());
        assert_eq!(metadata.digest_frequency, DigestFrequency::None);
    }
}
