//! Test broadcaster: records every published event.

use std::sync::Mutex;

use tabletop_core::broadcast::Broadcaster;
use tabletop_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

/// One event as seen by the broadcaster.
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    /// Session the event was published to.
    pub session_id: Uuid,
    /// Event type name.
    pub event_type: &'static str,
    /// Serialized payload.
    pub payload: serde_json::Value,
    /// Event metadata.
    pub metadata: EventMetadata,
}

/// A broadcaster that keeps everything it was asked to publish.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    published: Mutex<Vec<PublishedEvent>>,
}

impl RecordingBroadcaster {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published events, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<PublishedEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the published events of one type, oldest first.
    pub fn events_of_type(&self, event_type: &str) -> Vec<PublishedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event_type == event_type)
            .collect()
    }

    /// Returns the published event types in order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event_type).collect()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(&self, session_id: Uuid, event: &dyn DomainEvent) {
        self.published.lock().unwrap().push(PublishedEvent {
            session_id,
            event_type: event.event_type(),
            payload: event.to_payload(),
            metadata: event.metadata().clone(),
        });
    }
}
