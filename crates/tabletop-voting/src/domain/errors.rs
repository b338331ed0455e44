//! Error taxonomy for the absentee voting context.
//!
//! Every variant is recoverable; the HTTP layer turns them into user-facing
//! messages.

use tabletop_core::error::DomainError;
use thiserror::Error;
use uuid::Uuid;

use super::events::VoteStatus;

/// Errors raised by the vote ledger and the voting coordinator.
#[derive(Debug, Error)]
pub enum VotingError {
    /// A vote is already open for this character in this session.
    #[error("an absentee vote ({active_vote_id}) is already active for character {character_id} in session {session_id}")]
    DuplicateActiveVote {
        /// The live session.
        session_id: Uuid,
        /// The absent character.
        character_id: Uuid,
        /// The vote that is already open.
        active_vote_id: Uuid,
    },

    /// The character's player is connected.
    #[error("character {character_id} is not absent from session {session_id}")]
    CharacterNotAbsent {
        /// The live session.
        session_id: Uuid,
        /// The character named in the request.
        character_id: Uuid,
    },

    /// Nobody besides the absent player could vote.
    #[error("session {session_id} has {eligible} eligible voters; at least one is required")]
    InsufficientEligibleVoters {
        /// The live session.
        session_id: Uuid,
        /// Number of eligible voters found.
        eligible: usize,
    },

    /// No vote with this id exists.
    #[error("absentee vote not found: {0}")]
    VoteNotFound(Uuid),

    /// The vote no longer accepts ballots.
    #[error("absentee vote {vote_id} is no longer active (status {status})")]
    VoteNotActive {
        /// The vote.
        vote_id: Uuid,
        /// Its current status.
        status: VoteStatus,
    },

    /// The voter was not in the eligible snapshot.
    #[error("participant {voter_id} is not eligible to vote on {vote_id}")]
    VoterNotEligible {
        /// The vote.
        vote_id: Uuid,
        /// The rejected voter.
        voter_id: Uuid,
    },

    /// A collaborator or store failure.
    #[error(transparent)]
    Domain(#[from] DomainError),
}
