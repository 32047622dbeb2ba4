//! Address deliverability checks.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::EmailVerificationService;

use super::{http_client, http_error, join_url};

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    valid: bool,
}

/// Verification service reached over HTTP:
/// `POST {base}/verify` with `{"email"}` returning `{"valid": bool}`.
#[derive(Debug, Clone)]
pub struct HttpVerificationService {
    client: Client,
    base_url: String,
}

impl HttpVerificationService {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            client: http_client(timeout_seconds),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EmailVerificationService for HttpVerificationService {
    async fn verify(&self, address: &str) -> AppResult<bool> {
        let response = self
            .client
            .post(join_url(&self.base_url, "verify"))
            .json(&VerifyRequest { email: address })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error("verification", e))?;
        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| http_error("verification", e))?;
        Ok(body.valid)
    }
}

/// Treats every address as deliverable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllVerificationService;

#[async_trait]
impl EmailVerificationService for AcceptAllVerificationService {
    async fn verify(&self, _address: &str) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;

    #[tokio::test]
    async fn test_posts_address() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/verify")
            .match_body(Matcher::Json(serde_json::json!({"email": "a@b.org"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"valid": false}"#)
            .create_async()
            .await;

        let service = HttpVerificationService::new(format!("{}/", server.url()), 5);
        assert!(!service.verify("a@b.org").await.unwrap());
        mock.assert_async().await;
    }
}
