//! Turn-control mediator.
//!
//! Applies a passed vote to the live session. Failures here never reach the
//! voter: the ballot that triggered resolution succeeded, only its side
//! effect did not, so problems are logged and reported as "not applied".

use std::sync::Arc;

use tabletop_core::session::{AiAgentConfig, AiAgentRegistry, SkipOutcome, TurnOrder};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Bridge from resolved votes to the session's turn order and AI registry.
#[derive(Clone)]
pub struct TurnControlMediator {
    turn_order: Arc<dyn TurnOrder>,
    ai_agents: Arc<dyn AiAgentRegistry>,
}

impl TurnControlMediator {
    /// Creates a mediator over the session's collaborators.
    #[must_use]
    pub fn new(turn_order: Arc<dyn TurnOrder>, ai_agents: Arc<dyn AiAgentRegistry>) -> Self {
        Self {
            turn_order,
            ai_agents,
        }
    }

    /// Skips the character's pending turn in the current round. Returns
    /// whether a turn was actually skipped.
    #[instrument(skip(self))]
    pub async fn skip_turn(&self, session_id: Uuid, character_id: Uuid) -> bool {
        match self.turn_order.skip(session_id, character_id).await {
            Ok(SkipOutcome::Skipped) => {
                info!("skipped absent character's turn");
                true
            }
            Ok(SkipOutcome::AlreadyAdvanced) => {
                warn!("turn already advanced past character; skip is a no-op");
                false
            }
            Err(e) => {
                error!(error = %e, "failed to skip turn");
                false
            }
        }
    }

    /// Installs, updates, or removes the AI stand-in for the character.
    /// Returns whether the registry accepted the change.
    #[instrument(skip(self, config), fields(behavior = %config.behavior))]
    pub async fn set_ai_control(
        &self,
        session_id: Uuid,
        character_id: Uuid,
        config: &AiAgentConfig,
        active: bool,
    ) -> bool {
        match self
            .ai_agents
            .set_active(session_id, character_id, config, active)
            .await
        {
            Ok(()) => {
                info!("AI stand-in updated");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to update AI stand-in");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::session::AiBehavior;
    use tabletop_test_support::{RecordingAiAgentRegistry, RecordingTurnOrder};

    fn mediator(
        turn_order: &Arc<RecordingTurnOrder>,
        ai_agents: &Arc<RecordingAiAgentRegistry>,
    ) -> TurnControlMediator {
        TurnControlMediator::new(turn_order.clone(), ai_agents.clone())
    }

    #[tokio::test]
    async fn test_skip_turn_reports_skipped() {
        let turn_order = Arc::new(RecordingTurnOrder::new(SkipOutcome::Skipped));
        let ai_agents = Arc::new(RecordingAiAgentRegistry::new());
        let (session_id, character_id) = (Uuid::new_v4(), Uuid::new_v4());

        let skipped = mediator(&turn_order, &ai_agents)
            .skip_turn(session_id, character_id)
            .await;

        assert!(skipped);
        assert_eq!(turn_order.skips(), vec![(session_id, character_id)]);
    }

    #[tokio::test]
    async fn test_skip_turn_swallows_already_advanced() {
        let turn_order = Arc::new(RecordingTurnOrder::new(SkipOutcome::AlreadyAdvanced));
        let ai_agents = Arc::new(RecordingAiAgentRegistry::new());

        let skipped = mediator(&turn_order, &ai_agents)
            .skip_turn(Uuid::new_v4(), Uuid::new_v4())
            .await;

        assert!(!skipped);
        assert_eq!(turn_order.skips().len(), 1);
    }

    #[tokio::test]
    async fn test_skip_turn_swallows_collaborator_errors() {
        let turn_order = Arc::new(RecordingTurnOrder::failing());
        let ai_agents = Arc::new(RecordingAiAgentRegistry::new());

        let skipped = mediator(&turn_order, &ai_agents)
            .skip_turn(Uuid::new_v4(), Uuid::new_v4())
            .await;

        assert!(!skipped);
    }

    #[tokio::test]
    async fn test_set_ai_control_twice_keeps_one_stand_in_with_latest_config() {
        let turn_order = Arc::new(RecordingTurnOrder::new(SkipOutcome::Skipped));
        let ai_agents = Arc::new(RecordingAiAgentRegistry::new());
        let mediator = mediator(&turn_order, &ai_agents);
        let (session_id, character_id) = (Uuid::new_v4(), Uuid::new_v4());
        let bold = AiAgentConfig {
            behavior: AiBehavior::Bold,
            instructions: Some("protect the healer".to_owned()),
        };

        assert!(
            mediator
                .set_ai_control(session_id, character_id, &AiAgentConfig::default(), true)
                .await
        );
        assert!(
            mediator
                .set_ai_control(session_id, character_id, &bold, true)
                .await
        );

        assert_eq!(ai_agents.active_agents(), vec![(session_id, character_id, bold)]);
        assert_eq!(ai_agents.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_set_ai_control_reports_registry_failure() {
        let turn_order = Arc::new(RecordingTurnOrder::new(SkipOutcome::Skipped));
        let ai_agents = Arc::new(RecordingAiAgentRegistry::failing());

        let applied = mediator(&turn_order, &ai_agents)
            .set_ai_control(Uuid::new_v4(), Uuid::new_v4(), &AiAgentConfig::default(), true)
            .await;

        assert!(!applied);
        assert!(ai_agents.active_agents().is_empty());
    }
}
