//! Query handlers for the absentee voting context.
//!
//! Read paths return [`VoteSnapshot`], a serializable view that callers can
//! keep and re-read freely.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tabletop_core::aggregate::AggregateRoot;
use tabletop_core::session::AiAgentConfig;
use uuid::Uuid;

use crate::domain::aggregates::AbsenteeVote;
use crate::domain::errors::VotingError;
use crate::domain::events::{ResolutionCause, VoteStatus, VoteTally, VoteType};
use crate::domain::ledger::VoteLedger;

/// Read-only view of an absentee vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteSnapshot {
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
    /// Current status.
    pub status: VoteStatus,
    /// Participants entitled to vote.
    pub eligible_voters: Vec<Uuid>,
    /// Participants who voted in favor.
    pub votes_for: Vec<Uuid>,
    /// Participants who voted against.
    pub votes_against: Vec<Uuid>,
    /// Current counts.
    pub tally: VoteTally,
    /// Percentage threshold the vote was opened with.
    pub vote_threshold: u8,
    /// When the vote was opened.
    pub initiated_at: DateTime<Utc>,
    /// When ballots stop being accepted.
    pub expires_at: DateTime<Utc>,
    /// When the vote was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// What forced the resolution.
    pub resolution_cause: Option<ResolutionCause>,
    /// Whether an AI stand-in is playing the character.
    pub ai_agent_active: bool,
    /// Configuration of the AI stand-in.
    pub ai_agent_config: Option<AiAgentConfig>,
    /// Note from the initiator.
    pub reason: Option<String>,
    /// Number of events applied.
    pub version: i64,
}

impl From<&AbsenteeVote> for VoteSnapshot {
    fn from(vote: &AbsenteeVote) -> Self {
        Self {
            vote_id: vote.id,
            session_id: vote.session_id,
            campaign_id: vote.campaign_id,
            character_id: vote.character_id,
            initiator_id: vote.initiator_id,
            vote_type: vote.vote_type,
            status: vote.status(),
            eligible_voters: vote.eligible_voters().iter().copied().collect(),
            votes_for: vote.votes_for().iter().copied().collect(),
            votes_against: vote.votes_against().iter().copied().collect(),
            tally: vote.tally(),
            vote_threshold: vote.vote_threshold(),
            initiated_at: vote.initiated_at(),
            expires_at: vote.expires_at(),
            resolved_at: vote.resolved_at(),
            resolution_cause: vote.resolution_cause(),
            ai_agent_active: vote.ai_agent_active(),
            ai_agent_config: vote.ai_agent_config().cloned(),
            reason: vote.reason().map(ToOwned::to_owned),
            version: vote.version(),
        }
    }
}

/// Retrieves a vote by id.
///
/// # Errors
///
/// Returns `VotingError::VoteNotFound` for unknown ids.
pub async fn get_vote(vote_id: Uuid, ledger: &dyn VoteLedger) -> Result<VoteSnapshot, VotingError> {
    let vote = ledger.get(vote_id).await?;
    Ok(VoteSnapshot::from(&vote))
}

/// Lists the votes currently active in a session, oldest first.
pub async fn list_active_votes(session_id: Uuid, ledger: &dyn VoteLedger) -> Vec<VoteSnapshot> {
    let mut snapshots: Vec<VoteSnapshot> = ledger
        .list_active_by_session(session_id)
        .map(|vote| VoteSnapshot::from(&vote))
        .collect()
        .await;
    snapshots.sort_by_key(|snapshot| (snapshot.initiated_at, snapshot.vote_id));
    snapshots
}
