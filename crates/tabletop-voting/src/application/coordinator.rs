//! Voting coordinator.
//!
//! Owns the lifecycle of absentee votes: opening them against a snapshot of
//! the session, taking ballots, resolving by quorum or deadline, and handing
//! passed votes to the turn-control mediator. Every change is broadcast to
//! the session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tabletop_core::broadcast::Broadcaster;
use tabletop_core::clock::Clock;
use tabletop_core::session::SessionDirectory;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::expiry::{DeadlineHeap, ExpirySchedule};
use super::locks::VoteLocks;
use super::mediator::TurnControlMediator;
use super::query_handlers::{self, VoteSnapshot};
use super::settings::VotingSettings;
use crate::domain::aggregates::{AbsenteeVote, VoteDraft};
use crate::domain::commands::{CastAbsenteeBallot, InitiateAbsenteeVote, ReleaseAiControl};
use crate::domain::errors::VotingError;
use crate::domain::events::{ResolutionCause, VoteStatus, VoteType};
use crate::domain::ledger::{Ballot, VoteLedger};
use crate::domain::quorum::{self, QuorumOutcome};

/// Orchestrates absentee votes for every live session.
pub struct VotingCoordinator {
    ledger: Arc<dyn VoteLedger>,
    directory: Arc<dyn SessionDirectory>,
    broadcaster: Arc<dyn Broadcaster>,
    mediator: TurnControlMediator,
    clock: Arc<dyn Clock>,
    schedule: Arc<dyn ExpirySchedule>,
    locks: VoteLocks,
    settings: VotingSettings,
}

impl VotingCoordinator {
    /// Creates a coordinator with a [`DeadlineHeap`] expiry schedule.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn VoteLedger>,
        directory: Arc<dyn SessionDirectory>,
        broadcaster: Arc<dyn Broadcaster>,
        mediator: TurnControlMediator,
        clock: Arc<dyn Clock>,
        settings: VotingSettings,
    ) -> Self {
        Self {
            ledger,
            directory,
            broadcaster,
            mediator,
            clock,
            schedule: Arc::new(DeadlineHeap::new()),
            locks: VoteLocks::new(),
            settings,
        }
    }

    /// Replaces the expiry schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: Arc<dyn ExpirySchedule>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Settings applied to new votes.
    #[must_use]
    pub fn settings(&self) -> &VotingSettings {
        &self.settings
    }

    /// Current time according to the coordinator's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Opens a vote on an absent character.
    ///
    /// Eligible voters are the session's current participants, minus the
    /// absent character and the participant controlling it.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::CharacterNotAbsent`,
    /// `VotingError::InsufficientEligibleVoters`,
    /// `VotingError::DuplicateActiveVote`, or a `DomainError` from the
    /// session directory (unknown session).
    #[instrument(
        skip(self, command),
        fields(
            session_id = %command.session_id,
            character_id = %command.character_id,
            correlation_id = %command.correlation_id,
        )
    )]
    pub async fn initiate(
        &self,
        command: &InitiateAbsenteeVote,
    ) -> Result<VoteSnapshot, VotingError> {
        let session_id = command.session_id;
        let character_id = command.character_id;

        let campaign_id = self.directory.campaign_id(session_id).await?;
        if !self
            .directory
            .is_character_absent(session_id, character_id)
            .await?
        {
            return Err(VotingError::CharacterNotAbsent {
                session_id,
                character_id,
            });
        }

        let controller = self.directory.controller_of(session_id, character_id).await?;
        let mut eligible_voters = self.directory.eligible_participants(session_id).await?;
        eligible_voters.remove(&character_id);
        if let Some(controller) = controller {
            eligible_voters.remove(&controller);
        }
        if eligible_voters.is_empty() {
            return Err(VotingError::InsufficientEligibleVoters {
                session_id,
                eligible: 0,
            });
        }

        let draft = VoteDraft {
            vote_id: Uuid::new_v4(),
            session_id,
            campaign_id,
            character_id,
            initiator_id: command.initiator_id,
            vote_type: command.vote_type,
            eligible_voters,
            vote_threshold: self.settings.vote_threshold,
            window: self.settings.vote_window,
            reason: command.reason.clone(),
        };
        let mut vote = AbsenteeVote::initiate(draft, command.correlation_id, self.clock.as_ref())?;

        self.ledger.create(&vote).await?;
        self.schedule.schedule(vote.id, vote.expires_at());

        info!(
            vote_id = %vote.id,
            vote_type = ?vote.vote_type,
            required_votes = vote.required_votes(),
            eligible = vote.eligible_voters().len(),
            "absentee vote initiated"
        );
        self.publish(&mut vote);
        Ok(VoteSnapshot::from(&vote))
    }

    /// Casts or changes a ballot, resolving the vote if the ballot settles it.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::VoteNotFound`, `VotingError::VoterNotEligible`,
    /// or `VotingError::VoteNotActive` when the vote already closed
    /// (including a vote whose deadline passed before the sweep reached it).
    #[instrument(
        skip(self, command),
        fields(
            vote_id = %command.vote_id,
            voter_id = %command.voter_id,
            correlation_id = %command.correlation_id,
        )
    )]
    pub async fn cast_ballot(
        &self,
        command: &CastAbsenteeBallot,
    ) -> Result<VoteSnapshot, VotingError> {
        let _guard = self.locks.acquire(command.vote_id).await;

        let current = self.ledger.get(command.vote_id).await?;
        if !current.is_active() {
            return Err(VotingError::VoteNotActive {
                vote_id: current.id,
                status: current.status(),
            });
        }
        if current.is_past_deadline(self.clock.now()) {
            let mut vote = current;
            let status = quorum::evaluate_at_expiry(&vote, self.settings.expiry_policy);
            self.resolve_locked(&mut vote, status, ResolutionCause::Expiry, command.correlation_id)
                .await?;
            return Err(VotingError::VoteNotActive {
                vote_id: vote.id,
                status: vote.status(),
            });
        }

        let ballot = Ballot {
            voter_id: command.voter_id,
            in_favor: command.in_favor,
            correlation_id: command.correlation_id,
        };
        let mut vote = self
            .ledger
            .cast_ballot(command.vote_id, ballot, self.clock.as_ref())
            .await?;
        info!(in_favor = command.in_favor, "absentee ballot cast");
        self.publish(&mut vote);

        match quorum::evaluate(&vote) {
            QuorumOutcome::Pass => {
                self.resolve_locked(
                    &mut vote,
                    VoteStatus::Passed,
                    ResolutionCause::Quorum,
                    command.correlation_id,
                )
                .await?;
            }
            QuorumOutcome::Fail => {
                self.resolve_locked(
                    &mut vote,
                    VoteStatus::Failed,
                    ResolutionCause::Quorum,
                    command.correlation_id,
                )
                .await?;
            }
            QuorumOutcome::StillActive => {}
        }

        Ok(VoteSnapshot::from(&vote))
    }

    /// Resolves every active vote whose deadline is at or before `now`.
    /// Returns the votes this call resolved.
    #[instrument(skip(self))]
    pub async fn check_expirations(&self, now: DateTime<Utc>) -> Vec<VoteSnapshot> {
        let mut resolved = Vec::new();
        for vote_id in self.schedule.drain_due(now) {
            match self.expire(vote_id, now).await {
                Ok(Some(snapshot)) => resolved.push(snapshot),
                Ok(None) => {}
                Err(VotingError::VoteNotFound(_)) => {
                    warn!(%vote_id, "scheduled absentee vote no longer exists");
                }
                Err(e) => {
                    error!(%vote_id, error = %e, "failed to expire absentee vote; retrying next sweep");
                    self.schedule.schedule(vote_id, now);
                }
            }
        }
        resolved
    }

    /// Hands a character back from its AI stand-in, typically because the
    /// player reconnected. Returns the granting vote, or `None` when no
    /// stand-in was playing the character.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` if the ledger cannot be read or written.
    #[instrument(
        skip(self, command),
        fields(
            session_id = %command.session_id,
            character_id = %command.character_id,
            correlation_id = %command.correlation_id,
        )
    )]
    pub async fn release_ai_control(
        &self,
        command: &ReleaseAiControl,
    ) -> Result<Option<VoteSnapshot>, VotingError> {
        let Some(granting) = self
            .ledger
            .find_ai_controlled(command.session_id, command.character_id)
            .await?
        else {
            return Ok(None);
        };

        let _guard = self.locks.acquire(granting.id).await;
        let mut vote = self.ledger.get(granting.id).await?;
        if !vote.ai_agent_active() {
            return Ok(None);
        }

        let config = vote.ai_agent_config().cloned().unwrap_or_default();
        self.mediator
            .set_ai_control(vote.session_id, vote.character_id, &config, false)
            .await;
        vote.deactivate_ai_agent(command.correlation_id, self.clock.as_ref())?;
        self.ledger.save(&vote).await?;

        info!(vote_id = %vote.id, "AI stand-in released");
        self.publish(&mut vote);
        Ok(Some(VoteSnapshot::from(&vote)))
    }

    /// Retrieves a vote.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::VoteNotFound` for unknown ids.
    pub async fn get_vote(&self, vote_id: Uuid) -> Result<VoteSnapshot, VotingError> {
        query_handlers::get_vote(vote_id, self.ledger.as_ref()).await
    }

    /// Lists the active votes of a session.
    pub async fn list_active_votes(&self, session_id: Uuid) -> Vec<VoteSnapshot> {
        query_handlers::list_active_votes(session_id, self.ledger.as_ref()).await
    }

    async fn expire(
        &self,
        vote_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<VoteSnapshot>, VotingError> {
        let _guard = self.locks.acquire(vote_id).await;
        let mut vote = self.ledger.get(vote_id).await?;
        if !vote.is_active() {
            return Ok(None);
        }
        if !vote.is_past_deadline(now) {
            self.schedule.schedule(vote.id, vote.expires_at());
            return Ok(None);
        }

        let status = quorum::evaluate_at_expiry(&vote, self.settings.expiry_policy);
        self.resolve_locked(&mut vote, status, ResolutionCause::Expiry, Uuid::new_v4())
            .await?;
        Ok(Some(VoteSnapshot::from(&vote)))
    }

    /// Resolves `vote` and applies a passed outcome. Callers hold the vote's lock.
    async fn resolve_locked(
        &self,
        vote: &mut AbsenteeVote,
        status: VoteStatus,
        cause: ResolutionCause,
        correlation_id: Uuid,
    ) -> Result<(), VotingError> {
        vote.resolve(status, cause, correlation_id, self.clock.as_ref())?;
        self.ledger.save(vote).await?;

        info!(vote_id = %vote.id, %status, ?cause, tally = ?vote.tally(), "absentee vote resolved");
        self.publish(vote);

        if status == VoteStatus::Passed {
            self.apply_passed(vote, correlation_id).await?;
        }
        Ok(())
    }

    async fn apply_passed(
        &self,
        vote: &mut AbsenteeVote,
        correlation_id: Uuid,
    ) -> Result<(), VotingError> {
        match vote.vote_type {
            VoteType::SkipTurn => {
                self.mediator
                    .skip_turn(vote.session_id, vote.character_id)
                    .await;
            }
            VoteType::AiControl => {
                let config = self.settings.ai_agent.clone();
                if self
                    .mediator
                    .set_ai_control(vote.session_id, vote.character_id, &config, true)
                    .await
                {
                    self.retire_previous_stand_in(vote, correlation_id).await?;
                    vote.activate_ai_agent(config, correlation_id, self.clock.as_ref())?;
                    self.ledger.save(vote).await?;
                    self.publish(vote);
                }
            }
        }
        Ok(())
    }

    /// Marks the stand-in as no longer held by an earlier vote, now that
    /// `successor` has taken it over. Runs under the earlier vote's lock.
    async fn retire_previous_stand_in(
        &self,
        successor: &AbsenteeVote,
        correlation_id: Uuid,
    ) -> Result<(), VotingError> {
        let Some(previous) = self
            .ledger
            .find_ai_controlled(successor.session_id, successor.character_id)
            .await?
        else {
            return Ok(());
        };
        if previous.id == successor.id {
            return Ok(());
        }

        let _guard = self.locks.acquire(previous.id).await;
        let mut previous = self.ledger.get(previous.id).await?;
        if !previous.ai_agent_active() {
            return Ok(());
        }
        previous.deactivate_ai_agent(correlation_id, self.clock.as_ref())?;
        self.ledger.save(&previous).await?;

        info!(vote_id = %previous.id, successor_vote_id = %successor.id, "AI stand-in handed to newer vote");
        self.publish(&mut previous);
        Ok(())
    }

    fn publish(&self, vote: &mut AbsenteeVote) {
        for event in vote.take_uncommitted_events() {
            self.broadcaster.publish(vote.session_id, &event);
        }
    }
}
