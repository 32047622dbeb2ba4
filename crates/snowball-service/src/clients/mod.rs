//! HTTP clients for the external collaborators, plus local fallbacks used
//! when a collaborator is not configured.

pub mod notification;
pub mod reputation;
pub mod verification;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{error, info};

use snowball_cache::ReputationCache;
use snowball_core::config::AppConfig;
use snowball_core::error::{AppError, ErrorKind};
use snowball_core::traits::collaborators::{
    DomainReputationService, EmailVerificationService, NotificationSender,
};

pub use notification::{HttpNotificationSender, LogNotificationSender};
pub use reputation::{HttpReputationService, ZeroReputationService};
pub use verification::{AcceptAllVerificationService, HttpVerificationService};

/// The external collaborators a worker process talks to.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Cached domain reputation lookup.
    pub reputation: Arc<dyn DomainReputationService>,
    /// Address deliverability check.
    pub verification: Arc<dyn EmailVerificationService>,
    /// Owner notifications.
    pub notifier: Arc<dyn NotificationSender>,
}

impl Collaborators {
    /// Build the collaborators described by `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let upstream: Arc<dyn DomainReputationService> = match &config.reputation.base_url {
            Some(url) => Arc::new(HttpReputationService::new(url, config.reputation.timeout_seconds)),
            None => {
                info!("No reputation service configured; every domain scores 0");
                Arc::new(ZeroReputationService)
            }
        };
        let reputation = Arc::new(ReputationCache::new(&config.reputation, upstream));

        let verification: Arc<dyn EmailVerificationService> = match &config.verification.base_url {
            Some(url) => Arc::new(HttpVerificationService::new(
                url,
                config.verification.timeout_seconds,
            )),
            None => {
                info!("No verification service configured; every address is accepted");
                Arc::new(AcceptAllVerificationService)
            }
        };

        let notifier: Arc<dyn NotificationSender> = match &config.notifications.base_url {
            Some(url) => Arc::new(HttpNotificationSender::new(
                url,
                config.notifications.timeout_seconds,
            )),
            None => Arc::new(LogNotificationSender),
        };

        Self {
            reputation,
            verification,
            notifier,
        }
    }
}

/// Build an HTTP client with a request timeout.
pub(crate) fn http_client(timeout_seconds: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to build HTTP client with custom timeout, using default client");
            Client::new()
        })
}

/// Map a transport or status error of `service` into an [`AppError`].
pub(crate) fn http_error(service: &str, err: reqwest::Error) -> AppError {
    let kind = if err.is_timeout() || err.is_connect() {
        ErrorKind::ServiceUnavailable
    } else if err.is_decode() {
        ErrorKind::Serialization
    } else {
        ErrorKind::ExternalService
    };
    AppError::with_source(kind, format!("{service} request failed: {err}"), err)
}

/// Join a base URL and a path without doubling the separator.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://rep/", "/domains/a.org"), "http://rep/domains/a.org");
        assert_eq!(join_url("http://rep", "verify"), "http://rep/verify");
    }

    #[tokio::test]
    async fn test_unconfigured_collaborators_fall_back() {
        let collaborators = Collaborators::from_config(&AppConfig::default());
        assert_eq!(collaborators.reputation.check("any.org").await.unwrap(), 0.0);
        assert!(collaborators.verification.verify("a@any.org").await.unwrap());
        collaborators
            .notifier
            .send(snowball_core::types::id::UserId::new(), "t", &serde_json::json!({}))
            .await
            .unwrap();
    }
}
