//! In-process implementation of the `VoteLedger` trait.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tabletop_core::aggregate::AggregateRoot;
use tabletop_core::clock::Clock;
use tabletop_core::error::DomainError;
use tabletop_voting::domain::aggregates::AbsenteeVote;
use tabletop_voting::domain::errors::VotingError;
use tabletop_voting::domain::events::{VoteStatus, VoteType};
use tabletop_voting::domain::ledger::{Ballot, VoteLedger};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct LedgerState {
    votes: HashMap<Uuid, AbsenteeVote>,
    /// Active vote per (session, character).
    active: HashMap<(Uuid, Uuid), Uuid>,
}

impl LedgerState {
    fn store(&mut self, vote: &AbsenteeVote) {
        let mut stored = vote.clone();
        stored.clear_uncommitted_events();
        let key = (vote.session_id, vote.character_id);
        if stored.is_active() {
            self.active.insert(key, stored.id);
        } else if self.active.get(&key) == Some(&stored.id) {
            self.active.remove(&key);
        }
        self.votes.insert(stored.id, stored);
    }
}

/// Vote ledger held in process memory behind a single mutex.
///
/// Every operation completes while holding the mutex, so check-and-insert
/// on create and read-modify-write on ballots are atomic.
#[derive(Debug, Default)]
pub struct InMemoryVoteLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryVoteLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of votes stored, resolved ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().votes.len()
    }

    /// Whether no vote has ever been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_active(&self, vote_id: Uuid) -> Option<AbsenteeVote> {
        self.lock()
            .votes
            .get(&vote_id)
            .filter(|vote| vote.is_active())
            .cloned()
    }
}

#[async_trait]
impl VoteLedger for InMemoryVoteLedger {
    async fn create(&self, vote: &AbsenteeVote) -> Result<(), VotingError> {
        let mut state = self.lock();
        let key = (vote.session_id, vote.character_id);
        if let Some(active_vote_id) = state.active.get(&key) {
            return Err(VotingError::DuplicateActiveVote {
                session_id: vote.session_id,
                character_id: vote.character_id,
                active_vote_id: *active_vote_id,
            });
        }
        if let Some(existing) = state.votes.get(&vote.id) {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: vote.id,
                expected: 0,
                actual: existing.version(),
            }
            .into());
        }
        state.store(vote);
        debug!(vote_id = %vote.id, "stored new absentee vote");
        Ok(())
    }

    async fn get(&self, vote_id: Uuid) -> Result<AbsenteeVote, VotingError> {
        self.lock()
            .votes
            .get(&vote_id)
            .cloned()
            .ok_or(VotingError::VoteNotFound(vote_id))
    }

    async fn cast_ballot(
        &self,
        vote_id: Uuid,
        ballot: Ballot,
        clock: &dyn Clock,
    ) -> Result<AbsenteeVote, VotingError> {
        let mut state = self.lock();
        let mut vote = state
            .votes
            .get(&vote_id)
            .cloned()
            .ok_or(VotingError::VoteNotFound(vote_id))?;
        vote.cast_ballot(ballot.voter_id, ballot.in_favor, ballot.correlation_id, clock)?;
        state.store(&vote);
        Ok(vote)
    }

    async fn save(&self, vote: &AbsenteeVote) -> Result<(), VotingError> {
        let mut state = self.lock();
        let stored_version = state
            .votes
            .get(&vote.id)
            .map(|stored| stored.version())
            .ok_or(VotingError::VoteNotFound(vote.id))?;
        let expected = vote.persisted_version();
        if stored_version != expected {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: vote.id,
                expected,
                actual: stored_version,
            }
            .into());
        }
        state.store(vote);
        Ok(())
    }

    fn list_active_by_session(&self, session_id: Uuid) -> BoxStream<'_, AbsenteeVote> {
        let vote_ids: Vec<Uuid> = self
            .lock()
            .active
            .iter()
            .filter(|((session, _), _)| *session == session_id)
            .map(|(_, vote_id)| *vote_id)
            .collect();
        stream::iter(vote_ids)
            .filter_map(move |vote_id| futures::future::ready(self.load_active(vote_id)))
            .boxed()
    }

    async fn find_ai_controlled(
        &self,
        session_id: Uuid,
        character_id: Uuid,
    ) -> Result<Option<AbsenteeVote>, VotingError> {
        let state = self.lock();
        Ok(state
            .votes
            .values()
            .filter(|vote| {
                vote.session_id == session_id
                    && vote.character_id == character_id
                    && vote.vote_type == VoteType::AiControl
                    && vote.status() == VoteStatus::Passed
                    && vote.ai_agent_active()
            })
            .max_by_key(|vote| vote.resolved_at())
            .cloned())
    }
}
