//! Vote ledger abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tabletop_core::clock::Clock;
use uuid::Uuid;

use super::aggregates::AbsenteeVote;
use super::errors::VotingError;

/// One participant's ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ballot {
    /// The participant voting.
    pub voter_id: Uuid,
    /// Whether the ballot supports the vote.
    pub in_favor: bool,
    /// Correlation ID of the command that carried the ballot.
    pub correlation_id: Uuid,
}

/// Keyed store of absentee votes. Votes are never deleted; resolved ones
/// remain as history.
#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Stores a newly initiated vote.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::DuplicateActiveVote` if an active vote already
    /// exists for the same session and character.
    async fn create(&self, vote: &AbsenteeVote) -> Result<(), VotingError>;

    /// Loads a vote.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::VoteNotFound` for unknown ids.
    async fn get(&self, vote_id: Uuid) -> Result<AbsenteeVote, VotingError>;

    /// Applies `ballot` and stores the result. The returned vote carries the
    /// `BallotCast` event as uncommitted so the caller can broadcast it.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::VoteNotFound`, `VotingError::VoteNotActive` or
    /// `VotingError::VoterNotEligible`.
    async fn cast_ballot(
        &self,
        vote_id: Uuid,
        ballot: Ballot,
        clock: &dyn Clock,
    ) -> Result<AbsenteeVote, VotingError>;

    /// Stores changes recorded on `vote` since it was loaded.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the stored version moved
    /// on since `vote` was loaded.
    async fn save(&self, vote: &AbsenteeVote) -> Result<(), VotingError>;

    /// Streams the active votes of a session. Each call starts a new pass
    /// over the votes active at that moment.
    fn list_active_by_session(&self, session_id: Uuid) -> BoxStream<'_, AbsenteeVote>;

    /// Returns the passed AI-control vote whose stand-in is still playing
    /// `character_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on store failures.
    async fn find_ai_controlled(
        &self,
        session_id: Uuid,
        character_id: Uuid,
    ) -> Result<Option<AbsenteeVote>, VotingError>;
}
