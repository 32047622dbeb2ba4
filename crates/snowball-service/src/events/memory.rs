//! In-memory pub/sub for single-node deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use snowball_core::result::AppResult;
use snowball_core::traits::collaborators::EventPublisher;

/// Default per-channel buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// In-memory pub/sub implementation.
#[derive(Debug)]
pub struct MemoryPubSub {
    /// Channel name → broadcast sender
    channels: RwLock<HashMap<String, broadcast::Sender<Value>>>,
    buffer_size: usize,
}

impl MemoryPubSub {
    /// Create a new in-memory pub/sub
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            buffer_size,
        }
    }

    /// Subscribe to a channel, returns a receiver
    pub async fn subscribe(&self, channel: &str) -> broadcast::Receiver<Value> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0);
        tx.subscribe()
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

#[async_trait]
impl EventPublisher for MemoryPubSub {
    async fn publish(&self, channel: &str, event: &Value) -> AppResult<()> {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(channel) {
            // No receivers is not an error.
            let delivered = tx.send(event.clone()).unwrap_or(0);
            trace!(channel, delivered, "Event published");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let pubsub = MemoryPubSub::default();
        let mut rx = pubsub.subscribe("repository:1").await;
        pubsub
            .publish("repository:1", &json!({"type": "repository.growth"}))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap()["type"], "repository.growth");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let pubsub = MemoryPubSub::default();
        assert!(pubsub.publish("nobody", &json!({})).await.is_ok());
    }
}
