//! Aggregate root for the absentee voting context.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use tabletop_core::aggregate::AggregateRoot;
use tabletop_core::clock::Clock;
use tabletop_core::error::DomainError;
use tabletop_core::event::EventMetadata;
use tabletop_core::session::AiAgentConfig;
use uuid::Uuid;

use super::errors::VotingError;
use super::events::{
    AiControlChanged, BallotCast, ResolutionCause, VoteEvent, VoteEventKind, VoteInitiated,
    VoteResolved, VoteStatus, VoteTally, VoteType,
};
use super::quorum;

/// Everything needed to open a vote, gathered by the coordinator.
#[derive(Debug, Clone)]
pub struct VoteDraft {
    /// Identifier for the new vote.
    pub vote_id: Uuid,
    /// The live session.
    pub session_id: Uuid,
    /// The campaign the session belongs to.
    pub campaign_id: Uuid,
    /// The absent character.
    pub character_id: Uuid,
    /// The participant opening the vote.
    pub initiator_id: Uuid,
    /// What the vote decides.
    pub vote_type: VoteType,
    /// Snapshot of the participants entitled to vote.
    pub eligible_voters: BTreeSet<Uuid>,
    /// Percentage of eligible voters needed to pass.
    pub vote_threshold: u8,
    /// How long ballots are accepted.
    pub window: TimeDelta,
    /// Optional note from the initiator.
    pub reason: Option<String>,
}

/// One vote on the fate of an absent character's turn.
///
/// Identity fields never change after initiation. Everything else moves
/// only through recorded events, so the aggregate can be rebuilt from its
/// history and every change can be broadcast.
#[derive(Debug, Clone)]
pub struct AbsenteeVote {
    /// Aggregate identifier.
    pub id: Uuid,
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
    status: VoteStatus,
    eligible_voters: BTreeSet<Uuid>,
    votes_for: BTreeSet<Uuid>,
    votes_against: BTreeSet<Uuid>,
    required_votes: usize,
    vote_threshold: u8,
    initiated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    resolution_cause: Option<ResolutionCause>,
    ai_agent_active: bool,
    ai_agent_config: Option<AiAgentConfig>,
    reason: Option<String>,
    version: i64,
    uncommitted_events: Vec<VoteEvent>,
}

impl AbsenteeVote {
    /// Creates an empty vote shell, ready to have its history applied.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            session_id: Uuid::nil(),
            campaign_id: Uuid::nil(),
            character_id: Uuid::nil(),
            initiator_id: Uuid::nil(),
            vote_type: VoteType::SkipTurn,
            status: VoteStatus::Active,
            eligible_voters: BTreeSet::new(),
            votes_for: BTreeSet::new(),
            votes_against: BTreeSet::new(),
            required_votes: 0,
            vote_threshold: 0,
            initiated_at: DateTime::<Utc>::UNIX_EPOCH,
            expires_at: DateTime::<Utc>::UNIX_EPOCH,
            resolved_at: None,
            resolution_cause: None,
            ai_agent_active: false,
            ai_agent_config: None,
            reason: None,
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }

    /// Opens a vote from `draft`, producing a `VoteInitiated` event.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::InsufficientEligibleVoters` if the snapshot is
    /// empty, and `DomainError::Validation` for a threshold above 100 or a
    /// non-positive window.
    pub fn initiate(
        draft: VoteDraft,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, VotingError> {
        if draft.eligible_voters.is_empty() {
            return Err(VotingError::InsufficientEligibleVoters {
                session_id: draft.session_id,
                eligible: 0,
            });
        }
        if draft.vote_threshold > 100 {
            return Err(DomainError::Validation(format!(
                "vote threshold must be a percentage, got {}",
                draft.vote_threshold
            ))
            .into());
        }
        if draft.window <= TimeDelta::zero() {
            return Err(
                DomainError::Validation("vote window must be positive".to_owned()).into(),
            );
        }

        let now = clock.now();
        let eligible = draft.eligible_voters.len();
        let required_votes = quorum::required_votes(eligible, draft.vote_threshold);

        let mut vote = Self::new(draft.vote_id);
        vote.record(
            VoteEventKind::VoteInitiated(VoteInitiated {
                vote_id: draft.vote_id,
                session_id: draft.session_id,
                campaign_id: draft.campaign_id,
                character_id: draft.character_id,
                initiator_id: draft.initiator_id,
                vote_type: draft.vote_type,
                eligible_voters: draft.eligible_voters.into_iter().collect(),
                vote_threshold: draft.vote_threshold,
                status: VoteStatus::Active,
                tally: VoteTally {
                    votes_for: 0,
                    votes_against: 0,
                    required_votes,
                    eligible,
                },
                expires_at: now + draft.window,
                reason: draft.reason,
            }),
            correlation_id,
            now,
        );
        Ok(vote)
    }

    /// Casts or replaces `voter_id`'s ballot, producing a `BallotCast` event.
    ///
    /// Casting again moves the voter to the other side; the last ballot wins.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::VoteNotActive` once the vote is resolved and
    /// `VotingError::VoterNotEligible` for voters outside the snapshot.
    pub fn cast_ballot(
        &mut self,
        voter_id: Uuid,
        in_favor: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), VotingError> {
        self.ensure_active()?;
        if !self.eligible_voters.contains(&voter_id) {
            return Err(VotingError::VoterNotEligible {
                vote_id: self.id,
                voter_id,
            });
        }

        let mut tally = self.tally();
        if self.votes_for.contains(&voter_id) {
            tally.votes_for -= 1;
        }
        if self.votes_against.contains(&voter_id) {
            tally.votes_against -= 1;
        }
        if in_favor {
            tally.votes_for += 1;
        } else {
            tally.votes_against += 1;
        }

        self.record(
            VoteEventKind::BallotCast(BallotCast {
                vote_id: self.id,
                voter_id,
                in_favor,
                status: VoteStatus::Active,
                tally,
            }),
            correlation_id,
            clock.now(),
        );
        Ok(())
    }

    /// Moves the vote to a terminal `status`, producing a `VoteResolved` event.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::VoteNotActive` if already resolved and
    /// `DomainError::Validation` if `status` is `Active`.
    pub fn resolve(
        &mut self,
        status: VoteStatus,
        cause: ResolutionCause,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), VotingError> {
        self.ensure_active()?;
        if !status.is_terminal() {
            return Err(DomainError::Validation(
                "a vote can only be resolved to a terminal status".to_owned(),
            )
            .into());
        }

        let resolved_at = clock.now();
        self.record(
            VoteEventKind::VoteResolved(VoteResolved {
                vote_id: self.id,
                character_id: self.character_id,
                vote_type: self.vote_type,
                status,
                cause,
                tally: self.tally(),
                resolved_at,
            }),
            correlation_id,
            resolved_at,
        );
        Ok(())
    }

    /// Records that an AI stand-in took over the character, or updates the
    /// configuration of the one already playing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless this is a passed
    /// `AiControl` vote.
    pub fn activate_ai_agent(
        &mut self,
        config: AiAgentConfig,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), VotingError> {
        self.ensure_grants_ai_control()?;
        self.record(
            VoteEventKind::AiControlChanged(AiControlChanged {
                vote_id: self.id,
                character_id: self.character_id,
                active: true,
                config: Some(config),
                status: self.status,
                tally: self.tally(),
            }),
            correlation_id,
            clock.now(),
        );
        Ok(())
    }

    /// Records that the AI stand-in handed the character back. A no-op when
    /// no stand-in is active.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless this is a passed
    /// `AiControl` vote.
    pub fn deactivate_ai_agent(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), VotingError> {
        self.ensure_grants_ai_control()?;
        if !self.ai_agent_active {
            return Ok(());
        }
        self.record(
            VoteEventKind::AiControlChanged(AiControlChanged {
                vote_id: self.id,
                character_id: self.character_id,
                active: false,
                config: self.ai_agent_config.clone(),
                status: self.status,
                tally: self.tally(),
            }),
            correlation_id,
            clock.now(),
        );
        Ok(())
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> VoteStatus {
        self.status
    }

    /// Whether ballots are still accepted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == VoteStatus::Active
    }

    /// Participants entitled to vote.
    #[must_use]
    pub fn eligible_voters(&self) -> &BTreeSet<Uuid> {
        &self.eligible_voters
    }

    /// Participants who voted in favor.
    #[must_use]
    pub fn votes_for(&self) -> &BTreeSet<Uuid> {
        &self.votes_for
    }

    /// Participants who voted against.
    #[must_use]
    pub fn votes_against(&self) -> &BTreeSet<Uuid> {
        &self.votes_against
    }

    /// Ballots in favor needed to pass.
    #[must_use]
    pub fn required_votes(&self) -> usize {
        self.required_votes
    }

    /// Percentage threshold the vote was opened with.
    #[must_use]
    pub fn vote_threshold(&self) -> u8 {
        self.vote_threshold
    }

    /// When the vote was opened.
    #[must_use]
    pub fn initiated_at(&self) -> DateTime<Utc> {
        self.initiated_at
    }

    /// When ballots stop being accepted.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the deadline has been reached at `now`.
    #[must_use]
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// When the vote was resolved; `None` while active.
    #[must_use]
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// What forced the resolution; `None` while active.
    #[must_use]
    pub fn resolution_cause(&self) -> Option<ResolutionCause> {
        self.resolution_cause
    }

    /// Whether an AI stand-in is currently playing the character.
    #[must_use]
    pub fn ai_agent_active(&self) -> bool {
        self.ai_agent_active
    }

    /// Configuration of the AI stand-in, once one has been installed.
    #[must_use]
    pub fn ai_agent_config(&self) -> Option<&AiAgentConfig> {
        self.ai_agent_config.as_ref()
    }

    /// Note from the initiator.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Current counts.
    #[must_use]
    pub fn tally(&self) -> VoteTally {
        VoteTally {
            votes_for: self.votes_for.len(),
            votes_against: self.votes_against.len(),
            required_votes: self.required_votes,
            eligible: self.eligible_voters.len(),
        }
    }

    /// Removes and returns the events recorded since the last drain.
    pub fn take_uncommitted_events(&mut self) -> Vec<VoteEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }

    fn ensure_active(&self) -> Result<(), VotingError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(VotingError::VoteNotActive {
                vote_id: self.id,
                status: self.status,
            })
        }
    }

    fn ensure_grants_ai_control(&self) -> Result<(), VotingError> {
        if self.vote_type == VoteType::AiControl && self.status == VoteStatus::Passed {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "vote {} did not grant AI control",
                self.id
            ))
            .into())
        }
    }

    fn record(&mut self, kind: VoteEventKind, correlation_id: Uuid, occurred_at: DateTime<Utc>) {
        let event = VoteEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.version + 1,
                correlation_id,
                causation_id: correlation_id,
                occurred_at,
            },
            kind,
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for AbsenteeVote {
    type Event = VoteEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            VoteEventKind::VoteInitiated(payload) => {
                self.session_id = payload.session_id;
                self.campaign_id = payload.campaign_id;
                self.character_id = payload.character_id;
                self.initiator_id = payload.initiator_id;
                self.vote_type = payload.vote_type;
                self.status = VoteStatus::Active;
                self.eligible_voters = payload.eligible_voters.iter().copied().collect();
                self.required_votes = payload.tally.required_votes;
                self.vote_threshold = payload.vote_threshold;
                self.initiated_at = event.metadata.occurred_at;
                self.expires_at = payload.expires_at;
                self.reason.clone_from(&payload.reason);
            }
            VoteEventKind::BallotCast(payload) => {
                self.votes_for.remove(&payload.voter_id);
                self.votes_against.remove(&payload.voter_id);
                if payload.in_favor {
                    self.votes_for.insert(payload.voter_id);
                } else {
                    self.votes_against.insert(payload.voter_id);
                }
            }
            VoteEventKind::VoteResolved(payload) => {
                self.status = payload.status;
                self.resolved_at = Some(payload.resolved_at);
                self.resolution_cause = Some(payload.cause);
            }
            VoteEventKind::AiControlChanged(payload) => {
                self.ai_agent_active = payload.active;
                if payload.config.is_some() {
                    self.ai_agent_config.clone_from(&payload.config);
                }
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tabletop_core::event::DomainEvent;
    use tabletop_core::session::AiBehavior;
    use tabletop_test_support::FixedClock;

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn voters(count: usize) -> Vec<Uuid> {
        (0..count).map(|_| Uuid::new_v4()).collect()
    }

    fn draft(vote_type: VoteType, eligible: &[Uuid]) -> VoteDraft {
        VoteDraft {
            vote_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            character_id: Uuid::new_v4(),
            initiator_id: eligible[0],
            vote_type,
            eligible_voters: eligible.iter().copied().collect(),
            vote_threshold: 50,
            window: TimeDelta::minutes(5),
            reason: Some("stepped away".to_owned()),
        }
    }

    fn open_vote(vote_type: VoteType, eligible: &[Uuid]) -> AbsenteeVote {
        let mut vote =
            AbsenteeVote::initiate(draft(vote_type, eligible), Uuid::new_v4(), &fixed_clock())
                .unwrap();
        vote.clear_uncommitted_events();
        vote
    }

    // --- initiate ---

    #[test]
    fn test_initiate_snapshots_voters_and_computes_required_votes() {
        let clock = fixed_clock();
        let eligible = voters(5);
        let correlation_id = Uuid::new_v4();
        let draft = draft(VoteType::SkipTurn, &eligible);
        let vote_id = draft.vote_id;

        let vote = AbsenteeVote::initiate(draft, correlation_id, &clock).unwrap();

        assert_eq!(vote.id, vote_id);
        assert_eq!(vote.status(), VoteStatus::Active);
        assert_eq!(vote.eligible_voters().len(), 5);
        assert_eq!(vote.required_votes(), 3);
        assert_eq!(vote.initiated_at(), clock.0);
        assert_eq!(vote.expires_at(), clock.0 + TimeDelta::minutes(5));
        assert!(vote.resolved_at().is_none());
        assert_eq!(vote.reason(), Some("stepped away"));
        assert_eq!(vote.version(), 1);

        let events = vote.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "voting.vote_initiated");
        let meta = events[0].metadata();
        assert_eq!(meta.aggregate_id, vote_id);
        assert_eq!(meta.sequence_number, 1);
        assert_eq!(meta.correlation_id, correlation_id);
        assert_eq!(meta.occurred_at, clock.0);
    }

    #[test]
    fn test_initiate_without_eligible_voters_returns_error() {
        let mut draft = draft(VoteType::SkipTurn, &voters(1));
        draft.eligible_voters.clear();

        let result = AbsenteeVote::initiate(draft, Uuid::new_v4(), &fixed_clock());

        match result.unwrap_err() {
            VotingError::InsufficientEligibleVoters { eligible, .. } => assert_eq!(eligible, 0),
            other => panic!("expected InsufficientEligibleVoters, got {other:?}"),
        }
    }

    #[test]
    fn test_initiate_with_threshold_above_hundred_returns_validation_error() {
        let mut draft = draft(VoteType::SkipTurn, &voters(3));
        draft.vote_threshold = 101;

        let result = AbsenteeVote::initiate(draft, Uuid::new_v4(), &fixed_clock());

        assert!(matches!(
            result.unwrap_err(),
            VotingError::Domain(DomainError::Validation(_))
        ));
    }

    // --- cast_ballot ---

    #[test]
    fn test_cast_ballot_again_moves_voter_between_sides() {
        let eligible = voters(4);
        let mut vote = open_vote(VoteType::SkipTurn, &eligible);
        let clock = fixed_clock();

        vote.cast_ballot(eligible[1], true, Uuid::new_v4(), &clock).unwrap();
        vote.cast_ballot(eligible[1], false, Uuid::new_v4(), &clock).unwrap();

        assert!(vote.votes_for().is_empty());
        assert_eq!(vote.votes_against().len(), 1);
        assert!(vote.votes_against().contains(&eligible[1]));
        assert!(vote.votes_for().is_disjoint(vote.votes_against()));
    }

    #[test]
    fn test_cast_ballot_event_carries_post_ballot_tally() {
        let eligible = voters(4);
        let mut vote = open_vote(VoteType::SkipTurn, &eligible);
        let clock = fixed_clock();
        vote.cast_ballot(eligible[1], true, Uuid::new_v4(), &clock).unwrap();
        vote.clear_uncommitted_events();

        vote.cast_ballot(eligible[1], false, Uuid::new_v4(), &clock).unwrap();

        let events = vote.uncommitted_events();
        assert_eq!(events[0].metadata().sequence_number, 3);
        match &events[0].kind {
            VoteEventKind::BallotCast(payload) => {
                assert_eq!(payload.tally.votes_for, 0);
                assert_eq!(payload.tally.votes_against, 1);
                assert_eq!(payload.tally, vote.tally());
            }
            other => panic!("expected BallotCast, got {other:?}"),
        }
    }

    #[test]
    fn test_cast_ballot_from_ineligible_voter_returns_error() {
        let mut vote = open_vote(VoteType::SkipTurn, &voters(3));
        let outsider = Uuid::new_v4();

        let result = vote.cast_ballot(outsider, true, Uuid::new_v4(), &fixed_clock());

        match result.unwrap_err() {
            VotingError::VoterNotEligible { voter_id, .. } => assert_eq!(voter_id, outsider),
            other => panic!("expected VoterNotEligible, got {other:?}"),
        }
        assert!(vote.uncommitted_events().is_empty());
    }

    #[test]
    fn test_cast_ballot_on_resolved_vote_returns_not_active() {
        let eligible = voters(3);
        let mut vote = open_vote(VoteType::SkipTurn, &eligible);
        let clock = fixed_clock();
        vote.resolve(VoteStatus::Expired, ResolutionCause::Expiry, Uuid::new_v4(), &clock)
            .unwrap();

        let result = vote.cast_ballot(eligible[0], true, Uuid::new_v4(), &clock);

        match result.unwrap_err() {
            VotingError::VoteNotActive { status, .. } => assert_eq!(status, VoteStatus::Expired),
            other => panic!("expected VoteNotActive, got {other:?}"),
        }
    }

    // --- resolve ---

    #[test]
    fn test_resolve_sets_resolved_at_exactly_once() {
        let mut vote = open_vote(VoteType::SkipTurn, &voters(3));
        let clock = fixed_clock();

        vote.resolve(VoteStatus::Passed, ResolutionCause::Quorum, Uuid::new_v4(), &clock)
            .unwrap();
        let second = vote.resolve(
            VoteStatus::Failed,
            ResolutionCause::Quorum,
            Uuid::new_v4(),
            &FixedClock(clock.0 + TimeDelta::seconds(1)),
        );

        assert!(second.is_err());
        assert_eq!(vote.status(), VoteStatus::Passed);
        assert_eq!(vote.resolved_at(), Some(clock.0));
        assert_eq!(vote.resolution_cause(), Some(ResolutionCause::Quorum));
    }

    #[test]
    fn test_resolve_to_active_returns_validation_error() {
        let mut vote = open_vote(VoteType::SkipTurn, &voters(3));

        let result = vote.resolve(
            VoteStatus::Active,
            ResolutionCause::Quorum,
            Uuid::new_v4(),
            &fixed_clock(),
        );

        assert!(matches!(
            result.unwrap_err(),
            VotingError::Domain(DomainError::Validation(_))
        ));
        assert!(vote.resolved_at().is_none());
    }

    // --- AI control ---

    #[test]
    fn test_activate_ai_agent_twice_updates_config_in_place() {
        let mut vote = open_vote(VoteType::AiControl, &voters(3));
        let clock = fixed_clock();
        vote.resolve(VoteStatus::Passed, ResolutionCause::Quorum, Uuid::new_v4(), &clock)
            .unwrap();

        vote.activate_ai_agent(AiAgentConfig::default(), Uuid::new_v4(), &clock)
            .unwrap();
        let bold = AiAgentConfig {
            behavior: AiBehavior::Bold,
            instructions: None,
        };
        vote.activate_ai_agent(bold.clone(), Uuid::new_v4(), &clock)
            .unwrap();

        assert!(vote.ai_agent_active());
        assert_eq!(vote.ai_agent_config(), Some(&bold));
    }

    #[test]
    fn test_deactivate_ai_agent_keeps_last_config_for_audit() {
        let mut vote = open_vote(VoteType::AiControl, &voters(3));
        let clock = fixed_clock();
        vote.resolve(VoteStatus::Passed, ResolutionCause::Quorum, Uuid::new_v4(), &clock)
            .unwrap();
        vote.activate_ai_agent(AiAgentConfig::default(), Uuid::new_v4(), &clock)
            .unwrap();
        vote.clear_uncommitted_events();

        vote.deactivate_ai_agent(Uuid::new_v4(), &clock).unwrap();
        vote.deactivate_ai_agent(Uuid::new_v4(), &clock).unwrap();

        assert!(!vote.ai_agent_active());
        assert_eq!(vote.ai_agent_config(), Some(&AiAgentConfig::default()));
        assert_eq!(vote.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_activate_ai_agent_on_skip_turn_vote_returns_error() {
        let mut vote = open_vote(VoteType::SkipTurn, &voters(3));
        let clock = fixed_clock();
        vote.resolve(VoteStatus::Passed, ResolutionCause::Quorum, Uuid::new_v4(), &clock)
            .unwrap();

        let result = vote.activate_ai_agent(AiAgentConfig::default(), Uuid::new_v4(), &clock);

        assert!(result.is_err());
        assert!(!vote.ai_agent_active());
    }

    // --- apply ---

    #[test]
    fn test_replaying_recorded_events_rebuilds_identical_state() {
        let eligible = voters(4);
        let clock = fixed_clock();
        let mut vote =
            AbsenteeVote::initiate(draft(VoteType::SkipTurn, &eligible), Uuid::new_v4(), &clock)
                .unwrap();
        vote.cast_ballot(eligible[1], true, Uuid::new_v4(), &clock).unwrap();
        vote.cast_ballot(eligible[2], false, Uuid::new_v4(), &clock).unwrap();
        vote.resolve(VoteStatus::Failed, ResolutionCause::Quorum, Uuid::new_v4(), &clock)
            .unwrap();

        let mut rebuilt = AbsenteeVote::new(vote.id);
        for event in vote.uncommitted_events() {
            rebuilt.apply(event);
        }

        assert_eq!(rebuilt.version(), vote.version());
        assert_eq!(rebuilt.status(), VoteStatus::Failed);
        assert_eq!(rebuilt.votes_for(), vote.votes_for());
        assert_eq!(rebuilt.votes_against(), vote.votes_against());
        assert_eq!(rebuilt.required_votes(), 2);
        assert_eq!(rebuilt.resolved_at(), vote.resolved_at());
    }

    #[test]
    fn test_persisted_version_excludes_uncommitted_events() {
        let eligible = voters(3);
        let mut vote = open_vote(VoteType::SkipTurn, &eligible);

        vote.cast_ballot(eligible[0], true, Uuid::new_v4(), &fixed_clock())
            .unwrap();

        assert_eq!(vote.version(), 2);
        assert_eq!(vote.persisted_version(), 1);
    }
}
