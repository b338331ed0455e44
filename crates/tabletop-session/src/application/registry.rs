//! In-process registry of live sessions.
//!
//! Implements the session ports of `tabletop-core`, so the voting core can
//! look participants up and change the flow of play without owning sessions.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use tabletop_core::error::DomainError;
use tabletop_core::session::{
    AiAgentConfig, AiAgentRegistry, SessionDirectory, SkipOutcome, TurnOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::live_session::{LiveSession, SessionSnapshot};

/// Every live session hosted by this process.
#[derive(Debug, Default)]
pub struct LiveSessionRegistry {
    sessions: RwLock<HashMap<Uuid, LiveSession>>,
}

impl LiveSessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new session for `campaign_id`.
    #[instrument(skip(self))]
    pub fn open_session(&self, campaign_id: Uuid) -> SessionSnapshot {
        let session = LiveSession::new(Uuid::new_v4(), campaign_id);
        let snapshot = session.snapshot();
        self.write().insert(session.id, session);
        info!(session_id = %snapshot.session_id, "live session opened");
        snapshot
    }

    /// Seats a participant in a session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for unknown sessions and
    /// `DomainError::Validation` if the character is already taken.
    #[instrument(skip(self))]
    pub fn join(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
        character_id: Option<Uuid>,
    ) -> Result<SessionSnapshot, DomainError> {
        self.update(session_id, |session| {
            session.join(participant_id, character_id)
        })
    }

    /// Marks a participant away. Returns the session and the character the
    /// participant plays.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for unknown sessions or participants.
    #[instrument(skip(self))]
    pub fn disconnect(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
    ) -> Result<(SessionSnapshot, Option<Uuid>), DomainError> {
        let mut character_id = None;
        let snapshot = self.update(session_id, |session| {
            character_id = session.disconnect(participant_id)?;
            Ok(())
        })?;
        info!(character_id = ?character_id, "participant disconnected");
        Ok((snapshot, character_id))
    }

    /// Marks a participant back. Returns the session and the character the
    /// participant plays.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for unknown sessions or participants.
    #[instrument(skip(self))]
    pub fn reconnect(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
    ) -> Result<(SessionSnapshot, Option<Uuid>), DomainError> {
        let mut character_id = None;
        let snapshot = self.update(session_id, |session| {
            character_id = session.reconnect(participant_id)?;
            Ok(())
        })?;
        info!(character_id = ?character_id, "participant reconnected");
        Ok((snapshot, character_id))
    }

    /// Starts the next round of a session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for unknown sessions and
    /// `DomainError::Validation` for an invalid initiative order.
    #[instrument(skip(self, initiative), fields(characters = initiative.len()))]
    pub fn start_round(
        &self,
        session_id: Uuid,
        initiative: Vec<Uuid>,
    ) -> Result<SessionSnapshot, DomainError> {
        self.update(session_id, |session| {
            let round = session.start_round(initiative)?;
            info!(round, "round started");
            Ok(())
        })
    }

    /// Ends the acting character's turn.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for unknown sessions and
    /// `DomainError::Validation` when no turn is in progress.
    #[instrument(skip(self))]
    pub fn complete_turn(&self, session_id: Uuid) -> Result<SessionSnapshot, DomainError> {
        self.update(session_id, |session| session.complete_turn().map(|_| ()))
    }

    /// Returns a view of the session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for unknown sessions.
    pub fn snapshot(&self, session_id: Uuid) -> Result<SessionSnapshot, DomainError> {
        self.read(session_id, LiveSession::snapshot)
    }

    fn read<T>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&LiveSession) -> T,
    ) -> Result<T, DomainError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session_id)
            .map(f)
            .ok_or_else(|| DomainError::session_not_found(session_id))
    }

    fn update(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut LiveSession) -> Result<(), DomainError>,
    ) -> Result<SessionSnapshot, DomainError> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| DomainError::session_not_found(session_id))?;
        f(session)?;
        Ok(session.snapshot())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, LiveSession>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionDirectory for LiveSessionRegistry {
    async fn campaign_id(&self, session_id: Uuid) -> Result<Uuid, DomainError> {
        self.read(session_id, |session| session.campaign_id)
    }

    async fn eligible_participants(&self, session_id: Uuid) -> Result<BTreeSet<Uuid>, DomainError> {
        self.read(session_id, |session| session.connected_participants().collect())
    }

    async fn is_character_absent(
        &self,
        session_id: Uuid,
        character_id: Uuid,
    ) -> Result<bool, DomainError> {
        self.read(session_id, |session| session.is_character_absent(character_id))?
    }

    async fn controller_of(
        &self,
        session_id: Uuid,
        character_id: Uuid,
    ) -> Result<Option<Uuid>, DomainError> {
        self.read(session_id, |session| session.controller_of(character_id))
    }
}

#[async_trait]
impl TurnOrder for LiveSessionRegistry {
    async fn skip(&self, session_id: Uuid, character_id: Uuid) -> Result<SkipOutcome, DomainError> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| DomainError::session_not_found(session_id))?;
        Ok(session.skip(character_id))
    }
}

#[async_trait]
impl AiAgentRegistry for LiveSessionRegistry {
    async fn set_active(
        &self,
        session_id: Uuid,
        character_id: Uuid,
        config: &AiAgentConfig,
        active: bool,
    ) -> Result<(), DomainError> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| DomainError::session_not_found(session_id))?;
        session.set_ai_stand_in(character_id, config, active);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tabletop_core::session::AiBehavior;

    use super::*;

    #[test]
    fn test_open_session_returns_empty_snapshot() {
        let registry = LiveSessionRegistry::new();
        let campaign_id = Uuid::new_v4();

        let snapshot = registry.open_session(campaign_id);

        assert_eq!(snapshot.campaign_id, campaign_id);
        assert_eq!(snapshot.round, 0);
        assert!(snapshot.participants.is_empty());
        assert_eq!(registry.snapshot(snapshot.session_id).unwrap(), snapshot);
    }

    #[test]
    fn test_operations_on_unknown_session_return_not_found() {
        let registry = LiveSessionRegistry::new();
        let session_id = Uuid::new_v4();

        assert!(matches!(
            registry.join(session_id, Uuid::new_v4(), None),
            Err(DomainError::NotFound { entity: "session", .. })
        ));
        assert!(registry.snapshot(session_id).is_err());
        assert!(registry.complete_turn(session_id).is_err());
    }

    #[test]
    fn test_disconnect_reports_played_character() {
        let registry = LiveSessionRegistry::new();
        let session_id = registry.open_session(Uuid::new_v4()).session_id;
        let (player, character) = (Uuid::new_v4(), Uuid::new_v4());
        registry.join(session_id, player, Some(character)).unwrap();

        let (snapshot, played) = registry.disconnect(session_id, player).unwrap();

        assert_eq!(played, Some(character));
        assert!(!snapshot.participants[0].connected);
    }

    #[tokio::test]
    async fn test_directory_lists_only_connected_participants() {
        // Arrange
        let registry = LiveSessionRegistry::new();
        let campaign_id = Uuid::new_v4();
        let session_id = registry.open_session(campaign_id).session_id;
        let (away, gm, rogue) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let away_character = Uuid::new_v4();
        registry.join(session_id, away, Some(away_character)).unwrap();
        registry.join(session_id, gm, None).unwrap();
        registry.join(session_id, rogue, Some(Uuid::new_v4())).unwrap();

        // Act
        registry.disconnect(session_id, away).unwrap();

        // Assert
        let eligible = registry.eligible_participants(session_id).await.unwrap();
        assert_eq!(eligible, BTreeSet::from([gm, rogue]));
        assert_eq!(registry.campaign_id(session_id).await.unwrap(), campaign_id);
        assert!(
            registry
                .is_character_absent(session_id, away_character)
                .await
                .unwrap()
        );
        assert_eq!(
            registry.controller_of(session_id, away_character).await.unwrap(),
            Some(away)
        );
    }

    #[tokio::test]
    async fn test_turn_order_skip_touches_current_round_only() {
        let registry = LiveSessionRegistry::new();
        let session_id = registry.open_session(Uuid::new_v4()).session_id;
        let (fighter, absent) = (Uuid::new_v4(), Uuid::new_v4());
        registry.start_round(session_id, vec![fighter, absent]).unwrap();

        let first = registry.skip(session_id, absent).await.unwrap();
        let second = registry.skip(session_id, absent).await.unwrap();

        assert_eq!(first, SkipOutcome::Skipped);
        assert_eq!(second, SkipOutcome::AlreadyAdvanced);
        let snapshot = registry.snapshot(session_id).unwrap();
        assert_eq!(snapshot.pending, vec![fighter]);
        assert_eq!(snapshot.initiative, vec![fighter, absent]);
    }

    #[tokio::test]
    async fn test_ai_registry_installs_and_removes_stand_in() {
        let registry = LiveSessionRegistry::new();
        let session_id = registry.open_session(Uuid::new_v4()).session_id;
        let character = Uuid::new_v4();
        let config = AiAgentConfig {
            behavior: AiBehavior::Cautious,
            instructions: None,
        };

        registry
            .set_active(session_id, character, &config, true)
            .await
            .unwrap();
        let installed = registry.snapshot(session_id).unwrap().ai_stand_ins;
        registry
            .set_active(session_id, character, &config, false)
            .await
            .unwrap();

        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].config, config);
        assert!(registry.snapshot(session_id).unwrap().ai_stand_ins.is_empty());
    }
}
