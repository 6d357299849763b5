//! In-process pub/sub hub for realtime fan-out.
//!
//! Topic-keyed broadcast channels carrying event envelopes. Topics are
//! opaque strings; the hub has no knowledge of the event catalog. The
//! realtime router publishes to conversation, personal and presence topics
//! and every WebSocket connection task subscribes to the topics it belongs
//! to (see `domains/realtime`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::common::ConnectionId;

/// One outbound realtime event, addressed by topic.
///
/// `origin` is the connection that triggered the event; subscribers drop the
/// envelope when `exclude_origin` is set and they are that connection (the
/// socket.io "broadcast" semantics used for typing and presence events).
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: String,
    pub data: serde_json::Value,
    pub origin: Option<ConnectionId>,
    pub exclude_origin: bool,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
            origin: None,
            exclude_origin: false,
        }
    }

    /// Tag the originating connection without excluding it from delivery.
    pub fn from_connection(mut self, origin: ConnectionId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Tag the originating connection and exclude it from delivery.
    pub fn excluding(mut self, origin: ConnectionId) -> Self {
        self.origin = Some(origin);
        self.exclude_origin = true;
        self
    }

    /// Whether the given subscriber connection should receive this envelope.
    pub fn delivers_to(&self, subscriber: ConnectionId) -> bool {
        !(self.exclude_origin && self.origin == Some(subscriber))
    }
}

/// Topic-keyed broadcast hub.
///
/// Thread-safe, cloneable. Channels are created lazily on first subscribe.
#[derive(Clone)]
pub struct EventHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Envelope>>>>,
    capacity: usize,
}

impl EventHub {
    /// Create a hub with the default per-topic capacity (256 envelopes).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish an envelope to a topic. No-op if nobody is subscribed.
    pub async fn publish(&self, topic: &str, envelope: Envelope) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(topic) {
            // Send errors just mean no active receivers
            let _ = tx.send(envelope);
        }
    }

    /// Subscribe to a topic, creating the channel if needed.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<Envelope> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Remove topics with zero subscribers (housekeeping, called when a
    /// connection closes).
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }

    #[cfg(test)]
    async fn topic_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_subscribe_roundtrip() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe("user:abc").await;

        hub.publish("user:abc", Envelope::new("message_notification", json!({"x": 1})))
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, "message_notification");
        assert_eq!(received.data, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = EventHub::new();
        hub.publish("nobody:listening", Envelope::new("dropped", json!({})))
            .await;
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let hub = EventHub::new();
        let mut rx1 = hub.subscribe("chat:a:b").await;
        let mut rx2 = hub.subscribe("chat:a:b").await;

        hub.publish("chat:a:b", Envelope::new("new_message", json!({})))
            .await;

        assert_eq!(rx1.recv().await.unwrap().event, "new_message");
        assert_eq!(rx2.recv().await.unwrap().event, "new_message");
    }

    #[tokio::test]
    async fn test_cleanup_removes_empty_topics() {
        let hub = EventHub::new();
        let rx = hub.subscribe("ephemeral").await;
        assert_eq!(hub.topic_count().await, 1);

        drop(rx);
        hub.cleanup().await;
        assert_eq!(hub.topic_count().await, 0);
    }

    #[tokio::test]
    async fn test_excluding_origin_filters_sender() {
        let origin = ConnectionId::new();
        let other = ConnectionId::new();
        let envelope = Envelope::new("user_typing", json!({})).excluding(origin);

        assert!(!envelope.delivers_to(origin));
        assert!(envelope.delivers_to(other));
    }

    #[tokio::test]
    async fn test_tagged_origin_still_delivers_to_sender() {
        let origin = ConnectionId::new();
        let envelope = Envelope::new("new_message", json!({})).from_connection(origin);
        assert!(envelope.delivers_to(origin));
    }
}
