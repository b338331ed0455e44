//! Ports into the live play session.
//!
//! The voting core never owns session state. It looks participants up
//! through [`SessionDirectory`] and changes the flow of play only through
//! [`TurnOrder`] and [`AiAgentRegistry`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// How boldly an AI stand-in plays a character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiBehavior {
    /// Defends, heals and avoids spending limited resources.
    Cautious,
    /// Plays the character's role without taking large risks.
    #[default]
    Balanced,
    /// Presses the attack and spends resources freely.
    Bold,
}

impl fmt::Display for AiBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cautious => "cautious",
            Self::Balanced => "balanced",
            Self::Bold => "bold",
        };
        f.write_str(name)
    }
}

impl FromStr for AiBehavior {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cautious" => Ok(Self::Cautious),
            "balanced" => Ok(Self::Balanced),
            "bold" => Ok(Self::Bold),
            other => Err(DomainError::Validation(format!(
                "unknown AI behavior '{other}'"
            ))),
        }
    }
}

/// Configuration handed to an AI stand-in when it takes over a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAgentConfig {
    /// Play style.
    pub behavior: AiBehavior,
    /// Free-form guidance for the agent, if any.
    pub instructions: Option<String>,
}

/// Result of asking the turn order to skip a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The character was removed from the current round's pending queue.
    Skipped,
    /// The character was not pending in the current round; nothing changed.
    AlreadyAdvanced,
}

/// Identity and presence lookups against the live session.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    /// Returns the campaign the session belongs to.
    async fn campaign_id(&self, session_id: Uuid) -> Result<Uuid, DomainError>;

    /// Returns the participants currently entitled to take part in session decisions.
    async fn eligible_participants(&self, session_id: Uuid) -> Result<BTreeSet<Uuid>, DomainError>;

    /// Whether the player controlling `character_id` is away.
    async fn is_character_absent(
        &self,
        session_id: Uuid,
        character_id: Uuid,
    ) -> Result<bool, DomainError>;

    /// Returns the participant controlling `character_id`, if known.
    async fn controller_of(
        &self,
        session_id: Uuid,
        character_id: Uuid,
    ) -> Result<Option<Uuid>, DomainError>;
}

/// The session's turn order.
#[async_trait]
pub trait TurnOrder: Send + Sync {
    /// Removes `character_id` from the current round's pending actions.
    /// Later rounds are unaffected.
    async fn skip(&self, session_id: Uuid, character_id: Uuid) -> Result<SkipOutcome, DomainError>;
}

/// Registry of AI stand-ins playing absent characters.
#[async_trait]
pub trait AiAgentRegistry: Send + Sync {
    /// Installs, updates, or removes the stand-in for `character_id`.
    ///
    /// Activating an already active stand-in replaces its configuration in
    /// place; deactivating an absent one is a no-op.
    async fn set_active(
        &self,
        session_id: Uuid,
        character_id: Uuid,
        config: &AiAgentConfig,
        active: bool,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_behavior_parses_case_insensitively() {
        assert_eq!("Bold".parse::<AiBehavior>().unwrap(), AiBehavior::Bold);
        assert_eq!(" cautious ".parse::<AiBehavior>().unwrap(), AiBehavior::Cautious);
    }

    #[test]
    fn test_ai_behavior_rejects_unknown_names() {
        match "reckless".parse::<AiBehavior>() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("reckless")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_ai_agent_config_defaults_to_balanced_without_instructions() {
        let config = AiAgentConfig::default();
        assert_eq!(config.behavior, AiBehavior::Balanced);
        assert!(config.instructions.is_none());
    }
}
