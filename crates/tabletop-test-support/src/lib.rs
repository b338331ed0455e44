//! Shared test doubles for the tabletop session backend.

mod broadcast;
mod clock;
mod session;

pub use broadcast::{PublishedEvent, RecordingBroadcaster};
pub use clock::{FixedClock, ManualClock};
pub use session::{RecordingAiAgentRegistry, RecordingTurnOrder, StaticSessionDirectory};
