//! Domain reputation lookups.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::DomainReputationService;

use super::{http_client, http_error, join_url};

#[derive(Debug, Deserialize)]
struct ReputationResponse {
    score: f64,
}

/// Reputation service reached over HTTP:
/// `GET {base}/domains/{domain}/reputation` returning `{"score": f64}`.
#[derive(Debug, Clone)]
pub struct HttpReputationService {
    client: Client,
    base_url: String,
}

impl HttpReputationService {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            client: http_client(timeout_seconds),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DomainReputationService for HttpReputationService {
    async fn check(&self, domain: &str) -> AppResult<f64> {
        let url = join_url(&self.base_url, &format!("domains/{domain}/reputation"));
        debug!(domain, "Fetching domain reputation");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error("reputation", e))?;
        let body: ReputationResponse = response
            .json()
            .await
            .map_err(|e| http_error("reputation", e))?;
        Ok(body.score)
    }
}

/// Scores every domain 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroReputationService;

#[async_trait]
impl DomainReputationService for ZeroReputationService {
    async fn check(&self, _domain: &str) -> AppResult<f64> {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;
    use snowball_core::error::ErrorKind;

    use super::*;

    #[tokio::test]
    async fn test_reads_score() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/domains/trusted.org/reputation")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"score": 0.85}"#)
            .expect(1)
            .create_async()
            .await;

        let service = HttpReputationService::new(server.url(), 5);
        assert_eq!(service.check("trusted.org").await.unwrap(), 0.85);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/domains/down.org/reputation")
            .with_status(503)
            .create_async()
            .await;

        let service = HttpReputationService::new(server.url(), 5);
        let err = service.check("down.org").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
        assert!(err.is_retryable());
    }
}
