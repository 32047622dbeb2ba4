//! Retry backoff policy.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Largest exponent applied by exponential backoff; keeps the delay finite.
const MAX_EXPONENT: u32 = 20;

/// Shape of the retry delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "backoff_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles with each failed attempt.
    Exponential,
}

/// Delay schedule applied after a handler failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BackoffPolicy {
    /// Schedule shape.
    #[sqlx(rename = "backoff_kind")]
    pub kind: BackoffKind,
    /// Base delay in milliseconds.
    #[sqlx(rename = "backoff_delay_ms")]
    pub delay_ms: i64,
}

impl BackoffPolicy {
    /// Exponential backoff with the given base delay.
    pub fn exponential(delay_ms: i64) -> Self {
        Self {
            kind: BackoffKind::Exponential,
            delay_ms,
        }
    }

    /// Fixed backoff with the given delay.
    pub fn fixed(delay_ms: i64) -> Self {
        Self {
            kind: BackoffKind::Fixed,
            delay_ms,
        }
    }

    /// Delay before the next attempt after `attempts_made` attempts have failed.
    ///
    /// Exponential backoff waits `delay * 2^(attempts_made - 1)`, so the first
    /// retry waits exactly `delay`.
    pub fn delay_for(&self, attempts_made: i32) -> Duration {
        let base = self.delay_ms.max(0);
        let millis = match self.kind {
            BackoffKind::Fixed => base,
            BackoffKind::Exponential => {
                let exponent = (attempts_made.max(1) - 1).min(MAX_EXPONENT as i32) as u32;
                base.saturating_mul(1i64 << exponent)
            }
        };
        Duration::milliseconds(millis)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::exponential(2000)
    }
}
