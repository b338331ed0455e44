//! Broadcast port for pushing domain events to connected session participants.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Fire-and-forget delivery of events to everyone connected to a session.
///
/// Implementations must not block and must not fail the caller: a session
/// with nobody listening simply drops the event.
pub trait Broadcaster: Send + Sync {
    /// Publishes `event` to the participants of `session_id`.
    fn publish(&self, session_id: Uuid, event: &dyn DomainEvent);
}
