//! Change notification channel.
//!
//! This module provides the broadcast channel carrying reload
//! notifications from the watch orchestrator to every connected client,
//! plus the wire envelope used on the WebSocket transport.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// The single event kind carried by the channel.
pub const JSON_RELOAD_EVENT: &str = "json-reload";

/// One reload notification: the logical path of the changed file.
///
/// When the path equals the configured manifest path, the event is the
/// manifest-rebuilt sentinel clients gate their pending reloads on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReloadEvent {
    pub path: String,
}

impl ReloadEvent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Wire envelope for WebSocket frames: `{"event": "json-reload", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    pub data: ReloadEvent,
}

impl EventEnvelope {
    pub fn reload(event: ReloadEvent) -> Self {
        Self {
            event: JSON_RELOAD_EVENT.to_string(),
            data: event,
        }
    }
}

/// Broadcasts reload notifications to all subscribers.
///
/// Sending is fire-and-forget: no subscribers is fine. Subscriptions are
/// explicit - `subscribe` attaches, dropping the receiver detaches.
#[derive(Clone)]
pub struct ReloadChannel {
    sender: broadcast::Sender<ReloadEvent>,
}

impl ReloadChannel {
    /// Create a new channel with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a reload event to all subscribers.
    pub fn send(&self, event: ReloadEvent) {
        match self.sender.send(event.clone()) {
            Ok(count) => {
                crate::debug_event!("channel", "sent", "{} to {count} subscribers", event.path);
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("channel", "dropped", "no subscribers for {}", event.path);
            }
        }
    }

    /// Subscribe to receive reload notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_without_subscribers_does_not_panic() {
        let channel = ReloadChannel::new(4);
        channel.send(ReloadEvent::new("app/a.json"));
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let channel = ReloadChannel::new(8);
        let mut rx = channel.subscribe();

        channel.send(ReloadEvent::new("app/a.json"));
        channel.send(ReloadEvent::new("public/app.json"));

        assert_eq!(rx.recv().await.unwrap().path, "app/a.json");
        assert_eq!(rx.recv().await.unwrap().path, "public/app.json");
    }

    #[test]
    fn test_envelope_wire_format() {
        let envelope = EventEnvelope::reload(ReloadEvent::new("@shared/widgets/a.json"));
        let json = serde_json::to_string(&envelope).unwrap();

        assert_eq!(
            json,
            r#"{"event":"json-reload","data":{"path":"@shared/widgets/a.json"}}"#
        );

        let decoded: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.data.path, "@shared/widgets/a.json");
    }
}
