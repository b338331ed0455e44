//! Commands for the absentee voting context.

use tabletop_core::command::Command;
use uuid::Uuid;

use super::events::VoteType;

/// Command to open a vote on an absent character.
#[derive(Debug, Clone)]
pub struct InitiateAbsenteeVote {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The live session.
    pub session_id: Uuid,
    /// The absent character.
    pub character_id: Uuid,
    /// What the vote decides.
    pub vote_type: VoteType,
    /// The participant opening the vote.
    pub initiator_id: Uuid,
    /// Optional note shown to voters.
    pub reason: Option<String>,
}

impl Command for InitiateAbsenteeVote {
    fn command_type(&self) -> &'static str {
        "voting.initiate_absentee_vote"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to cast or change a ballot.
#[derive(Debug, Clone)]
pub struct CastAbsenteeBallot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The vote.
    pub vote_id: Uuid,
    /// The participant voting.
    pub voter_id: Uuid,
    /// Whether the ballot supports the vote.
    pub in_favor: bool,
}

impl Command for CastAbsenteeBallot {
    fn command_type(&self) -> &'static str {
        "voting.cast_absentee_ballot"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to hand a character back from its AI stand-in.
#[derive(Debug, Clone)]
pub struct ReleaseAiControl {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The live session.
    pub session_id: Uuid,
    /// The returning character.
    pub character_id: Uuid,
}

impl Command for ReleaseAiControl {
    fn command_type(&self) -> &'static str {
        "voting.release_ai_control"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
