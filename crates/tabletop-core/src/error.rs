//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors shared by every bounded context.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up (`"session"`, `"participant"`, ...).
        entity: &'static str,
        /// The identifier that was looked up.
        id: Uuid,
    },

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for a missing live session.
    #[must_use]
    pub fn session_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "session",
            id,
        }
    }
}
