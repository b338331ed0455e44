//! Tabletop API: error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tabletop_core::error::DomainError;
use tabletop_voting::domain::errors::VotingError;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The tracing pipeline could not be set up.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `VotingError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub VotingError);

impl From<VotingError> for ApiError {
    fn from(err: VotingError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(VotingError::Domain(err))
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            VotingError::DuplicateActiveVote { .. } => (StatusCode::CONFLICT, "duplicate_active_vote"),
            VotingError::CharacterNotAbsent { .. } => (StatusCode::CONFLICT, "character_not_absent"),
            VotingError::InsufficientEligibleVoters { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_eligible_voters",
            ),
            VotingError::VoteNotFound(_) => (StatusCode::NOT_FOUND, "vote_not_found"),
            VotingError::VoteNotActive { .. } => (StatusCode::CONFLICT, "vote_not_active"),
            VotingError::VoterNotEligible { .. } => (StatusCode::FORBIDDEN, "voter_not_eligible"),
            VotingError::Domain(DomainError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found"),
            VotingError::Domain(DomainError::ConcurrencyConflict { .. }) => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            VotingError::Domain(DomainError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            VotingError::Domain(DomainError::Infrastructure(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
