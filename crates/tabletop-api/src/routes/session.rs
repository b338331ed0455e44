//! Routes for live sessions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use tabletop_core::command::Command;
use tabletop_session::domain::live_session::SessionSnapshot;
use tabletop_voting::application::query_handlers::VoteSnapshot;
use tabletop_voting::domain::commands::ReleaseAiControl;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /sessions.
#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    /// The campaign being played.
    pub campaign_id: Uuid,
}

/// Request body for POST /sessions/{session_id}/participants.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// The joining participant.
    pub participant_id: Uuid,
    /// The character they play, if any.
    #[serde(default)]
    pub character_id: Option<Uuid>,
}

/// Request body for POST /sessions/{session_id}/rounds.
#[derive(Debug, Deserialize)]
pub struct StartRoundRequest {
    /// Characters in acting order.
    pub initiative: Vec<Uuid>,
}

/// Response body for a reconnect.
#[derive(Debug, Serialize)]
pub struct ReconnectResponse {
    /// The session after the participant returned.
    pub session: SessionSnapshot,
    /// The vote whose AI stand-in was released, if one was playing.
    pub released_vote: Option<VoteSnapshot>,
}

/// POST /sessions
#[instrument(skip_all, fields(campaign_id = %request.campaign_id))]
async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let snapshot = state.sessions.open_session(request.campaign_id);
    (StatusCode::CREATED, Json(snapshot))
}

/// GET /sessions/{session_id}
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.snapshot(session_id)?))
}

/// POST /sessions/{session_id}/participants
#[instrument(skip_all, fields(session_id = %session_id, participant_id = %request.participant_id))]
async fn join(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .sessions
        .join(session_id, request.participant_id, request.character_id)?;
    Ok(Json(snapshot))
}

/// POST /sessions/{session_id}/participants/{participant_id}/disconnect
async fn disconnect(
    State(state): State<AppState>,
    Path((session_id, participant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let (snapshot, _) = state.sessions.disconnect(session_id, participant_id)?;
    Ok(Json(snapshot))
}

/// POST /sessions/{session_id}/participants/{participant_id}/reconnect
///
/// A returning player takes their character back from any AI stand-in.
#[instrument(skip_all, fields(session_id = %session_id, participant_id = %participant_id))]
async fn reconnect(
    State(state): State<AppState>,
    Path((session_id, participant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ReconnectResponse>, ApiError> {
    let (_, character_id) = state.sessions.reconnect(session_id, participant_id)?;

    let released_vote = match character_id {
        Some(character_id) => {
            let command = ReleaseAiControl {
                correlation_id: Uuid::new_v4(),
                session_id,
                character_id,
            };
            info!(
                command_type = command.command_type(),
                correlation_id = %command.correlation_id,
                "handling command"
            );
            state.coordinator.release_ai_control(&command).await?
        }
        None => None,
    };

    let session = state.sessions.snapshot(session_id)?;
    Ok(Json(ReconnectResponse {
        session,
        released_vote,
    }))
}

/// POST /sessions/{session_id}/rounds
#[instrument(skip_all, fields(session_id = %session_id))]
async fn start_round(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<StartRoundRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.start_round(session_id, request.initiative)?))
}

/// POST /sessions/{session_id}/turns/complete
async fn complete_turn(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.complete_turn(session_id)?))
}

/// Returns the router for live sessions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(open_session))
        .route("/sessions/{session_id}", get(get_session))
        .route("/sessions/{session_id}/participants", post(join))
        .route(
            "/sessions/{session_id}/participants/{participant_id}/disconnect",
            post(disconnect),
        )
        .route(
            "/sessions/{session_id}/participants/{participant_id}/reconnect",
            post(reconnect),
        )
        .route("/sessions/{session_id}/rounds", post(start_round))
        .route("/sessions/{session_id}/turns/complete", post(complete_turn))
}
