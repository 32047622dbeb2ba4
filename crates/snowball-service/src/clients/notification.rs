//! Owner notification transports.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::NotificationSender;
use snowball_core::types::id::UserId;

use super::{http_client, http_error, join_url};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRequest<'a> {
    user_id: UserId,
    template: &'a str,
    data: &'a Value,
}

/// Notification gateway reached over HTTP: `POST {base}/notifications`.
#[derive(Debug, Clone)]
pub struct HttpNotificationSender {
    client: Client,
    base_url: String,
}

impl HttpNotificationSender {
    /// Create a client for the gateway at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            client: http_client(timeout_seconds),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    async fn send(&self, owner_id: UserId, template: &str, data: &Value) -> AppResult<()> {
        self.client
            .post(join_url(&self.base_url, "notifications"))
            .json(&NotificationRequest {
                user_id: owner_id,
                template,
                data,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error("notification", e))?;
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, owner_id: UserId, template: &str, data: &Value) -> AppResult<()> {
        info!(owner_id = %owner_id, template, data = %data, "Notification (not delivered)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;

    #[tokio::test]
    async fn test_posts_notification() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/notifications")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"template": "repository_growth", "data": {"total": 4}}),
            ))
            .with_status(202)
            .create_async()
            .await;

        let sender = HttpNotificationSender::new(server.url(), 5);
        sender
            .send(UserId::new(), "repository_growth", &serde_json::json!({"total": 4}))
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
