//! Test doubles for the live-session ports.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tabletop_core::error::DomainError;
use tabletop_core::session::{
    AiAgentConfig, AiAgentRegistry, SessionDirectory, SkipOutcome, TurnOrder,
};
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
struct SessionEntry {
    campaign_id: Uuid,
    participants: BTreeSet<Uuid>,
    absent: BTreeSet<Uuid>,
    controllers: HashMap<Uuid, Uuid>,
}

/// A session directory over fixed, test-provided sessions.
///
/// Unknown sessions produce `DomainError::NotFound`.
#[derive(Debug, Default)]
pub struct StaticSessionDirectory {
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl StaticSessionDirectory {
    /// Create a directory with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session with the given participants.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_session(
        self,
        session_id: Uuid,
        campaign_id: Uuid,
        participants: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        self.sessions.lock().unwrap().insert(
            session_id,
            SessionEntry {
                campaign_id,
                participants: participants.into_iter().collect(),
                ..SessionEntry::default()
            },
        );
        self
    }

    /// Marks `character_id` absent, optionally recording the participant
    /// who normally controls it.
    ///
    /// # Panics
    ///
    /// Panics if the session was not added first.
    #[must_use]
    pub fn with_absent_character(
        self,
        session_id: Uuid,
        character_id: Uuid,
        controller_id: Option<Uuid>,
    ) -> Self {
        {
            let mut sessions = self.sessions.lock().unwrap();
            let entry = sessions
                .get_mut(&session_id)
                .expect("with_absent_character called before with_session");
            entry.absent.insert(character_id);
            if let Some(controller_id) = controller_id {
                entry.controllers.insert(character_id, controller_id);
            }
        }
        self
    }

    /// Adds a participant to an existing session.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_participant(&self, session_id: Uuid, participant_id: Uuid) {
        if let Some(entry) = self.sessions.lock().unwrap().get_mut(&session_id) {
            entry.participants.insert(participant_id);
        }
    }

    /// Marks `character_id` present again.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn mark_present(&self, session_id: Uuid, character_id: Uuid) {
        if let Some(entry) = self.sessions.lock().unwrap().get_mut(&session_id) {
            entry.absent.remove(&character_id);
        }
    }

    fn entry(&self, session_id: Uuid) -> Result<SessionEntry, DomainError> {
        self.sessions
            .lock()
            .unwrap()
            .get(&session_id)
            .cloned()
            .ok_or_else(|| DomainError::session_not_found(session_id))
    }
}

#[async_trait]
impl SessionDirectory for StaticSessionDirectory {
    async fn campaign_id(&self, session_id: Uuid) -> Result<Uuid, DomainError> {
        Ok(self.entry(session_id)?.campaign_id)
    }

    async fn eligible_participants(&self, session_id: Uuid) -> Result<BTreeSet<Uuid>, DomainError> {
        Ok(self.entry(session_id)?.participants)
    }

    async fn is_character_absent(
        &self,
        session_id: Uuid,
        character_id: Uuid,
    ) -> Result<bool, DomainError> {
        Ok(self.entry(session_id)?.absent.contains(&character_id))
    }

    async fn controller_of(
        &self,
        session_id: Uuid,
        character_id: Uuid,
    ) -> Result<Option<Uuid>, DomainError> {
        Ok(self.entry(session_id)?.controllers.get(&character_id).copied())
    }
}

/// A turn order that records every skip and answers with a fixed outcome.
#[derive(Debug)]
pub struct RecordingTurnOrder {
    outcome: Option<SkipOutcome>,
    skips: Mutex<Vec<(Uuid, Uuid)>>,
}

impl RecordingTurnOrder {
    /// Create a turn order answering every skip with `outcome`.
    #[must_use]
    pub fn new(outcome: SkipOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            skips: Mutex::new(Vec::new()),
        }
    }

    /// Create a turn order whose skips always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            outcome: None,
            skips: Mutex::new(Vec::new()),
        }
    }

    /// Returns every `(session_id, character_id)` skip requested, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn skips(&self) -> Vec<(Uuid, Uuid)> {
        self.skips.lock().unwrap().clone()
    }
}

#[async_trait]
impl TurnOrder for RecordingTurnOrder {
    async fn skip(&self, session_id: Uuid, character_id: Uuid) -> Result<SkipOutcome, DomainError> {
        self.skips.lock().unwrap().push((session_id, character_id));
        self.outcome
            .ok_or_else(|| DomainError::Infrastructure("turn order unavailable".to_owned()))
    }
}

/// An AI registry that records calls and tracks which stand-ins are active.
#[derive(Debug, Default)]
pub struct RecordingAiAgentRegistry {
    failing: bool,
    calls: Mutex<Vec<(Uuid, Uuid, AiAgentConfig, bool)>>,
    active: Mutex<Vec<(Uuid, Uuid, AiAgentConfig)>>,
}

impl RecordingAiAgentRegistry {
    /// Create a registry that accepts every change.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that rejects every change.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Returns every `set_active` call, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<(Uuid, Uuid, AiAgentConfig, bool)> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the stand-ins currently active, in activation order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn active_agents(&self) -> Vec<(Uuid, Uuid, AiAgentConfig)> {
        self.active.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiAgentRegistry for RecordingAiAgentRegistry {
    async fn set_active(
        &self,
        session_id: Uuid,
        character_id: Uuid,
        config: &AiAgentConfig,
        active: bool,
    ) -> Result<(), DomainError> {
        self.calls
            .lock()
            .unwrap()
            .push((session_id, character_id, config.clone(), active));
        if self.failing {
            return Err(DomainError::Infrastructure(
                "AI agent registry unavailable".to_owned(),
            ));
        }

        let mut agents = self.active.lock().unwrap();
        let existing = agents
            .iter()
            .position(|(session, character, _)| *session == session_id && *character == character_id);
        match (existing, active) {
            (Some(index), true) => agents[index].2 = config.clone(),
            (None, true) => agents.push((session_id, character_id, config.clone())),
            (Some(index), false) => {
                agents.remove(index);
            }
            (None, false) => {}
        }
        Ok(())
    }
}
