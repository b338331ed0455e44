//! Domain events for the absentee voting context.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabletop_core::event::{DomainEvent, EventMetadata};
use tabletop_core::session::AiAgentConfig;
use uuid::Uuid;

/// What a passed vote does to the absent character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteType {
    /// Skip the character's pending turn in the current round.
    SkipTurn,
    /// Hand the character to an AI stand-in until the player returns.
    AiControl,
}

/// Lifecycle status of an absentee vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteStatus {
    /// Ballots are still being accepted.
    Active,
    /// The vote carried; its effect has been applied.
    Passed,
    /// Passing became impossible before the deadline.
    Failed,
    /// The deadline passed without a decisive result.
    Expired,
}

impl VoteStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for VoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "ACTIVE",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(name)
    }
}

/// Why a vote left the `Active` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionCause {
    /// The ballots alone decided the vote.
    Quorum,
    /// The deadline forced a decision.
    Expiry,
}

/// Running ballot counts, included in every broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Ballots in favor.
    pub votes_for: usize,
    /// Ballots against.
    pub votes_against: usize,
    /// Ballots in favor needed to pass.
    pub required_votes: usize,
    /// Size of the eligible-voter snapshot.
    pub eligible: usize,
}

/// Emitted when a vote is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteInitiated {
    /// The vote identifier.
    pub vote_id: Uuid,
    /// The live session.
    pub session_id: Uuid,
    /// The campaign the session belongs to.
    pub campaign_id: Uuid,
    /// The absent character.
    pub character_id: Uuid,
    /// The participant who opened the vote.
    pub initiator_id: Uuid,
    /// What the vote decides.
    pub vote_type: VoteType,
    /// Participants entitled to vote, fixed for the life of the vote.
    pub eligible_voters: Vec<Uuid>,
    /// Percentage of eligible voters needed to pass.
    pub vote_threshold: u8,
    /// Always `Active`.
    pub status: VoteStatus,
    /// Initial counts.
    pub tally: VoteTally,
    /// When ballots stop being accepted.
    pub expires_at: DateTime<Utc>,
    /// Optional note from the initiator.
    pub reason: Option<String>,
}

/// Emitted when a participant casts or changes a ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotCast {
    /// The vote identifier.
    pub vote_id: Uuid,
    /// The participant who voted.
    pub voter_id: Uuid,
    /// Whether the ballot supports the vote.
    pub in_favor: bool,
    /// Status at the time of the ballot (always `Active`).
    pub status: VoteStatus,
    /// Counts after this ballot.
    pub tally: VoteTally,
}

/// Emitted when a vote reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResolved {
    /// The vote identifier.
    pub vote_id: Uuid,
    /// The absent character.
    pub character_id: Uuid,
    /// What the vote decided.
    pub vote_type: VoteType,
    /// The terminal status.
    pub status: VoteStatus,
    /// What forced the decision.
    pub cause: ResolutionCause,
    /// Final counts.
    pub tally: VoteTally,
    /// When the vote was resolved.
    pub resolved_at: DateTime<Utc>,
}

/// Emitted when an AI stand-in takes over or hands back a character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiControlChanged {
    /// The vote that granted AI control.
    pub vote_id: Uuid,
    /// The character being played.
    pub character_id: Uuid,
    /// Whether the stand-in is now playing.
    pub active: bool,
    /// Configuration in effect while active.
    pub config: Option<AiAgentConfig>,
    /// Status of the granting vote (always `Passed`).
    pub status: VoteStatus,
    /// Final counts of the granting vote.
    pub tally: VoteTally,
}

/// Event type identifier for [`VoteInitiated`].
pub const VOTE_INITIATED_EVENT_TYPE: &str = "voting.vote_initiated";

/// Event type identifier for [`BallotCast`].
pub const BALLOT_CAST_EVENT_TYPE: &str = "voting.ballot_cast";

/// Event type identifier for [`VoteResolved`].
pub const VOTE_RESOLVED_EVENT_TYPE: &str = "voting.vote_resolved";

/// Event type identifier for [`AiControlChanged`].
pub const AI_CONTROL_CHANGED_EVENT_TYPE: &str = "voting.ai_control_changed";

/// Event payload variants for the absentee voting context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VoteEventKind {
    /// A vote was opened.
    VoteInitiated(VoteInitiated),
    /// A ballot was cast.
    BallotCast(BallotCast),
    /// A vote was resolved.
    VoteResolved(VoteResolved),
    /// AI control was granted or released.
    AiControlChanged(AiControlChanged),
}

impl VoteEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::VoteInitiated(_) => VOTE_INITIATED_EVENT_TYPE,
            Self::BallotCast(_) => BALLOT_CAST_EVENT_TYPE,
            Self::VoteResolved(_) => VOTE_RESOLVED_EVENT_TYPE,
            Self::AiControlChanged(_) => AI_CONTROL_CHANGED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the absentee voting context.
#[derive(Debug, Clone)]
pub struct VoteEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: VoteEventKind,
}

impl DomainEvent for VoteEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("VoteEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
