//! External collaborators consumed by the background core.

use async_trait::async_trait;
use serde_json::Value;

use crate::result::AppResult;
use crate::types::id::UserId;

/// Source of trust scores for mail domains.
#[async_trait]
pub trait DomainReputationService: Send + Sync + std::fmt::Debug + 'static {
    /// Reputation of `domain` in `[0, 1]`.
    async fn check(&self, domain: &str) -> AppResult<f64>;
}

/// Deliverability check for a single address.
#[async_trait]
pub trait EmailVerificationService: Send + Sync + std::fmt::Debug + 'static {
    /// Whether `address` accepts mail.
    async fn verify(&self, address: &str) -> AppResult<bool>;
}

/// Outbound notification transport (email, push, ...).
#[async_trait]
pub trait NotificationSender: Send + Sync + std::fmt::Debug + 'static {
    /// Render `template` with `data` and deliver it to `owner_id`.
    async fn send(&self, owner_id: UserId, template: &str, data: &Value) -> AppResult<()>;
}

/// Opaque publish/subscribe transport towards real-time clients.
#[async_trait]
pub trait EventPublisher: Send + Sync + std::fmt::Debug + 'static {
    /// Publish `event` on `channel`. Delivery is best effort.
    async fn publish(&self, channel: &str, event: &Value) -> AppResult<()>;
}
