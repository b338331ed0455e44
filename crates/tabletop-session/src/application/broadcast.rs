//! Channel-backed broadcaster.

use serde::Serialize;
use tabletop_core::broadcast::Broadcaster;
use tabletop_core::event::{DomainEvent, EventMetadata};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Default number of messages a slow subscriber may fall behind by.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// An event as delivered to session subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionMessage {
    /// Session the event belongs to.
    pub session_id: Uuid,
    /// Event type name.
    pub event_type: &'static str,
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event payload.
    pub payload: serde_json::Value,
}

/// Publishes domain events on a `tokio::sync::broadcast` channel shared by
/// every connection. Subscribers filter on `session_id`.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<SessionMessage>,
}

impl ChannelBroadcaster {
    /// Creates a broadcaster buffering up to `capacity` messages per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to every message published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionMessage> {
        self.sender.subscribe()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, session_id: Uuid, event: &dyn DomainEvent) {
        let message = SessionMessage {
            session_id,
            event_type: event.event_type(),
            metadata: event.metadata().clone(),
            payload: event.to_payload(),
        };
        if self.sender.send(message).is_err() {
            trace!(%session_id, event_type = event.event_type(), "no subscribers; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[derive(Debug)]
    struct Ping {
        metadata: EventMetadata,
    }

    impl DomainEvent for Ping {
        fn event_type(&self) -> &'static str {
            "test.ping"
        }

        fn to_payload(&self) -> serde_json::Value {
            serde_json::json!({ "ping": true })
        }

        fn metadata(&self) -> &EventMetadata {
            &self.metadata
        }
    }

    fn ping() -> Ping {
        let id = Uuid::new_v4();
        Ping {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: "test.ping".to_owned(),
                aggregate_id: id,
                sequence_number: 1,
                correlation_id: id,
                causation_id: id,
                occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            },
        }
    }

    #[tokio::test]
    async fn test_publish_delivers_to_subscribers() {
        let broadcaster = ChannelBroadcaster::default();
        let mut receiver = broadcaster.subscribe();
        let session_id = Uuid::new_v4();

        broadcaster.publish(session_id, &ping());

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.session_id, session_id);
        assert_eq!(message.event_type, "test.ping");
        assert_eq!(message.payload["ping"], true);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let broadcaster = ChannelBroadcaster::new(4);

        broadcaster.publish(Uuid::new_v4(), &ping());
    }
}
