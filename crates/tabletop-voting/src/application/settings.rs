//! Tunables for the voting coordinator.

use chrono::TimeDelta;
use tabletop_core::session::AiAgentConfig;

use crate::domain::quorum::ExpiryPolicy;

/// Default time ballots are accepted.
pub const DEFAULT_VOTE_WINDOW_SECS: i64 = 300;

/// Default percentage of eligible voters needed to pass.
pub const DEFAULT_VOTE_THRESHOLD: u8 = 50;

/// Settings applied to every vote the coordinator opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingSettings {
    /// How long ballots are accepted.
    pub vote_window: TimeDelta,
    /// Percentage of eligible voters needed to pass.
    pub vote_threshold: u8,
    /// Settlement of votes still undecided at their deadline.
    pub expiry_policy: ExpiryPolicy,
    /// Configuration for AI stand-ins installed by passed votes.
    pub ai_agent: AiAgentConfig,
}

impl Default for VotingSettings {
    fn default() -> Self {
        Self {
            vote_window: TimeDelta::seconds(DEFAULT_VOTE_WINDOW_SECS),
            vote_threshold: DEFAULT_VOTE_THRESHOLD,
            expiry_policy: ExpiryPolicy::default(),
            ai_agent: AiAgentConfig::default(),
        }
    }
}
