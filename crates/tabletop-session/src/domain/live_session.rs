//! A live play session.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;
use tabletop_core::error::DomainError;
use tabletop_core::session::{AiAgentConfig, SkipOutcome};
use uuid::Uuid;

/// A participant seated at the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// The participant identifier.
    pub participant_id: Uuid,
    /// The character this participant plays, if any.
    pub character_id: Option<Uuid>,
    /// Whether the participant is currently connected.
    pub connected: bool,
}

/// An AI stand-in playing an absent character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiStandIn {
    /// The character being played.
    pub character_id: Uuid,
    /// How the stand-in plays.
    pub config: AiAgentConfig,
}

/// Serializable view of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// The session identifier.
    pub session_id: Uuid,
    /// The campaign being played.
    pub campaign_id: Uuid,
    /// Current round number; zero before the first round starts.
    pub round: u32,
    /// Everyone who has joined, connected or not.
    pub participants: Vec<Participant>,
    /// The current round's initiative order.
    pub initiative: Vec<Uuid>,
    /// Characters still to act this round, next first.
    pub pending: Vec<Uuid>,
    /// The character whose turn it is.
    pub current_turn: Option<Uuid>,
    /// Active AI stand-ins.
    pub ai_stand_ins: Vec<AiStandIn>,
}

/// Presence, turn order and AI stand-ins for one session.
#[derive(Debug, Clone)]
pub struct LiveSession {
    /// Session identifier.
    pub id: Uuid,
    /// Campaign identifier.
    pub campaign_id: Uuid,
    participants: BTreeMap<Uuid, Participant>,
    round: u32,
    initiative: Vec<Uuid>,
    pending: VecDeque<Uuid>,
    ai_stand_ins: HashMap<Uuid, AiAgentConfig>,
}

impl LiveSession {
    /// Opens an empty session for `campaign_id`.
    #[must_use]
    pub fn new(id: Uuid, campaign_id: Uuid) -> Self {
        Self {
            id,
            campaign_id,
            participants: BTreeMap::new(),
            round: 0,
            initiative: Vec::new(),
            pending: VecDeque::new(),
            ai_stand_ins: HashMap::new(),
        }
    }

    /// Seats a participant, optionally playing `character_id`. Joining again
    /// marks the participant connected and updates the character.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if another participant already
    /// plays `character_id`.
    pub fn join(
        &mut self,
        participant_id: Uuid,
        character_id: Option<Uuid>,
    ) -> Result<(), DomainError> {
        if let Some(character_id) = character_id
            && let Some(other) = self.controller_of(character_id)
            && other != participant_id
        {
            return Err(DomainError::Validation(format!(
                "character {character_id} is already played by participant {other}"
            )));
        }
        self.participants.insert(
            participant_id,
            Participant {
                participant_id,
                character_id,
                connected: true,
            },
        );
        Ok(())
    }

    /// Marks a participant away. Returns the character they play.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for unknown participants.
    pub fn disconnect(&mut self, participant_id: Uuid) -> Result<Option<Uuid>, DomainError> {
        self.set_connected(participant_id, false)
    }

    /// Marks a participant back. Returns the character they play.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for unknown participants.
    pub fn reconnect(&mut self, participant_id: Uuid) -> Result<Option<Uuid>, DomainError> {
        self.set_connected(participant_id, true)
    }

    fn set_connected(
        &mut self,
        participant_id: Uuid,
        connected: bool,
    ) -> Result<Option<Uuid>, DomainError> {
        let participant = self
            .participants
            .get_mut(&participant_id)
            .ok_or(DomainError::NotFound {
                entity: "participant",
                id: participant_id,
            })?;
        participant.connected = connected;
        Ok(participant.character_id)
    }

    /// Participants currently connected.
    pub fn connected_participants(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.participants
            .values()
            .filter(|participant| participant.connected)
            .map(|participant| participant.participant_id)
    }

    /// The participant playing `character_id`.
    #[must_use]
    pub fn controller_of(&self, character_id: Uuid) -> Option<Uuid> {
        self.participants
            .values()
            .find(|participant| participant.character_id == Some(character_id))
            .map(|participant| participant.participant_id)
    }

    /// Whether the player of `character_id` is disconnected.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if nobody at the table plays the
    /// character.
    pub fn is_character_absent(&self, character_id: Uuid) -> Result<bool, DomainError> {
        self.participants
            .values()
            .find(|participant| participant.character_id == Some(character_id))
            .map(|participant| !participant.connected)
            .ok_or(DomainError::NotFound {
                entity: "character",
                id: character_id,
            })
    }

    /// Starts the next round with `initiative` as the acting order.
    /// Returns the new round number.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty order or one listing a
    /// character twice.
    pub fn start_round(&mut self, initiative: Vec<Uuid>) -> Result<u32, DomainError> {
        if initiative.is_empty() {
            return Err(DomainError::Validation(
                "initiative order must not be empty".to_owned(),
            ));
        }
        let mut seen = HashSet::with_capacity(initiative.len());
        if let Some(duplicate) = initiative.iter().find(|id| !seen.insert(**id)) {
            return Err(DomainError::Validation(format!(
                "character {duplicate} appears twice in the initiative order"
            )));
        }

        self.round += 1;
        self.pending = initiative.iter().copied().collect();
        self.initiative = initiative;
        Ok(self.round)
    }

    /// The character whose turn it is.
    #[must_use]
    pub fn current_turn(&self) -> Option<Uuid> {
        self.pending.front().copied()
    }

    /// Ends the acting character's turn. Returns the character that acts
    /// next, or `None` when the round is over.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when no turn is in progress.
    pub fn complete_turn(&mut self) -> Result<Option<Uuid>, DomainError> {
        if self.pending.pop_front().is_none() {
            return Err(DomainError::Validation(format!(
                "no turn in progress in round {}",
                self.round
            )));
        }
        Ok(self.current_turn())
    }

    /// Removes `character_id` from this round's pending turns. Later rounds
    /// are unaffected.
    pub fn skip(&mut self, character_id: Uuid) -> SkipOutcome {
        match self.pending.iter().position(|id| *id == character_id) {
            Some(index) => {
                self.pending.remove(index);
                SkipOutcome::Skipped
            }
            None => SkipOutcome::AlreadyAdvanced,
        }
    }

    /// Installs, reconfigures or removes the stand-in for `character_id`.
    pub fn set_ai_stand_in(&mut self, character_id: Uuid, config: &AiAgentConfig, active: bool) {
        if active {
            self.ai_stand_ins.insert(character_id, config.clone());
        } else {
            self.ai_stand_ins.remove(&character_id);
        }
    }

    /// The stand-in configuration for `character_id`, if one is active.
    #[must_use]
    pub fn ai_stand_in(&self, character_id: Uuid) -> Option<&AiAgentConfig> {
        self.ai_stand_ins.get(&character_id)
    }

    /// Builds a serializable view of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut ai_stand_ins: Vec<AiStandIn> = self
            .ai_stand_ins
            .iter()
            .map(|(character_id, config)| AiStandIn {
                character_id: *character_id,
                config: config.clone(),
            })
            .collect();
        ai_stand_ins.sort_by_key(|stand_in| stand_in.character_id);

        SessionSnapshot {
            session_id: self.id,
            campaign_id: self.campaign_id,
            round: self.round,
            participants: self.participants.values().cloned().collect(),
            initiative: self.initiative.clone(),
            pending: self.pending.iter().copied().collect(),
            current_turn: self.current_turn(),
            ai_stand_ins,
        }
    }
}
