//! Shared application state.

use std::sync::Arc;

use tabletop_core::clock::Clock;
use tabletop_session::application::broadcast::ChannelBroadcaster;
use tabletop_session::application::registry::LiveSessionRegistry;
use tabletop_vote_store::InMemoryVoteLedger;
use tabletop_voting::application::coordinator::VotingCoordinator;
use tabletop_voting::application::mediator::TurnControlMediator;
use tabletop_voting::application::settings::VotingSettings;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Absentee vote coordinator.
    pub coordinator: Arc<VotingCoordinator>,
    /// Live sessions hosted by this process.
    pub sessions: Arc<LiveSessionRegistry>,
    /// Event fan-out to connected participants.
    pub broadcaster: ChannelBroadcaster,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        coordinator: Arc<VotingCoordinator>,
        sessions: Arc<LiveSessionRegistry>,
        broadcaster: ChannelBroadcaster,
    ) -> Self {
        Self {
            coordinator,
            sessions,
            broadcaster,
        }
    }

    /// Wires the coordinator to an in-memory ledger and a fresh session
    /// registry, which serves as directory, turn order and AI registry.
    #[must_use]
    pub fn in_memory(settings: VotingSettings, clock: Arc<dyn Clock>) -> Self {
        let sessions = Arc::new(LiveSessionRegistry::new());
        let broadcaster = ChannelBroadcaster::default();
        let mediator = TurnControlMediator::new(sessions.clone(), sessions.clone());
        let coordinator = Arc::new(VotingCoordinator::new(
            Arc::new(InMemoryVoteLedger::new()),
            sessions.clone(),
            Arc::new(broadcaster.clone()),
            mediator,
            clock,
            settings,
        ));
        Self::new(coordinator, sessions, broadcaster)
    }
}
