//! Routes for absentee votes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use tabletop_core::command::Command;
use tabletop_voting::application::query_handlers::VoteSnapshot;
use tabletop_voting::domain::commands::{CastAbsenteeBallot, InitiateAbsenteeVote};
use tabletop_voting::domain::events::VoteType;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /sessions/{session_id}/absentee-votes.
#[derive(Debug, Deserialize)]
pub struct InitiateVoteRequest {
    /// The absent character.
    pub character_id: Uuid,
    /// `SKIP_TURN` or `AI_CONTROL`.
    pub vote_type: VoteType,
    /// The participant opening the vote.
    pub initiator_id: Uuid,
    /// Optional note shown to voters.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body for POST /absentee-votes/{vote_id}/ballots.
#[derive(Debug, Deserialize)]
pub struct CastBallotRequest {
    /// The participant voting.
    pub voter_id: Uuid,
    /// Whether the ballot supports the vote.
    pub in_favor: bool,
}

/// Response body listing a session's open votes.
#[derive(Debug, Serialize)]
pub struct ActiveVotesResponse {
    /// Open votes, oldest first.
    pub votes: Vec<VoteSnapshot>,
}

/// POST /sessions/{session_id}/absentee-votes
#[instrument(
    skip_all,
    fields(session_id = %session_id, character_id = %request.character_id, vote_type = ?request.vote_type)
)]
async fn initiate_vote(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<InitiateVoteRequest>,
) -> Result<(StatusCode, Json<VoteSnapshot>), ApiError> {
    let command = InitiateAbsenteeVote {
        correlation_id: Uuid::new_v4(),
        session_id,
        character_id: request.character_id,
        vote_type: request.vote_type,
        initiator_id: request.initiator_id,
        reason: request.reason,
    };

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id,
        "handling command"
    );

    let vote = state.coordinator.initiate(&command).await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

/// GET /sessions/{session_id}/absentee-votes
async fn list_active_votes(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ActiveVotesResponse>, ApiError> {
    state.sessions.snapshot(session_id)?;
    let votes = state.coordinator.list_active_votes(session_id).await;
    Ok(Json(ActiveVotesResponse { votes }))
}

/// GET /absentee-votes/{vote_id}
async fn get_vote(
    State(state): State<AppState>,
    Path(vote_id): Path<Uuid>,
) -> Result<Json<VoteSnapshot>, ApiError> {
    let vote = state.coordinator.get_vote(vote_id).await?;
    Ok(Json(vote))
}

/// POST /absentee-votes/{vote_id}/ballots
#[instrument(skip_all, fields(vote_id = %vote_id, voter_id = %request.voter_id))]
async fn cast_ballot(
    State(state): State<AppState>,
    Path(vote_id): Path<Uuid>,
    Json(request): Json<CastBallotRequest>,
) -> Result<Json<VoteSnapshot>, ApiError> {
    let command = CastAbsenteeBallot {
        correlation_id: Uuid::new_v4(),
        vote_id,
        voter_id: request.voter_id,
        in_favor: request.in_favor,
    };

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id,
        "handling command"
    );

    let vote = state.coordinator.cast_ballot(&command).await?;
    Ok(Json(vote))
}

/// Returns the router for absentee votes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions/{session_id}/absentee-votes",
            post(initiate_vote).get(list_active_votes),
        )
        .route("/absentee-votes/{vote_id}", get(get_vote))
        .route("/absentee-votes/{vote_id}/ballots", post(cast_ballot))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use tabletop_test_support::FixedClock;
    use tabletop_voting::application::settings::VotingSettings;
    use tower::ServiceExt;

    /// A session with one disconnected player and `voters` connected ones.
    struct Table {
        state: AppState,
        session_id: Uuid,
        absent_player: Uuid,
        absent_character: Uuid,
        voters: Vec<Uuid>,
    }

    fn table(voters: usize) -> Table {
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap(),
        ));
        let state = AppState::in_memory(VotingSettings::default(), clock);
        let session_id = state.sessions.open_session(Uuid::new_v4()).session_id;
        let (absent_player, absent_character) = (Uuid::new_v4(), Uuid::new_v4());
        state
            .sessions
            .join(session_id, absent_player, Some(absent_character))
            .unwrap();
        state.sessions.disconnect(session_id, absent_player).unwrap();
        let voters: Vec<Uuid> = (0..voters)
            .map(|_| {
                let voter = Uuid::new_v4();
                state
                    .sessions
                    .join(session_id, voter, Some(Uuid::new_v4()))
                    .unwrap();
                voter
            })
            .collect();

        Table {
            state,
            session_id,
            absent_player,
            absent_character,
            voters,
        }
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let app = router().with_state(state.clone());
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn open_vote(table: &Table, vote_type: &str) -> (StatusCode, Value) {
        send(
            &table.state,
            "POST",
            &format!("/sessions/{}/absentee-votes", table.session_id),
            Some(serde_json::json!({
                "character_id": table.absent_character,
                "vote_type": vote_type,
                "initiator_id": table.voters[0],
            })),
        )
        .await
    }

    #[tokio::test]
    async fn test_initiate_vote_returns_201_with_active_vote() {
        // Arrange
        let table = table(4);

        // Act
        let (status, json) = open_vote(&table, "SKIP_TURN").await;

        // Assert
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["vote_type"], "SKIP_TURN");
        assert_eq!(json["tally"]["required_votes"], 2);
        assert_eq!(json["eligible_voters"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_initiate_vote_for_connected_character_returns_409() {
        let table = table(2);
        table
            .state
            .sessions
            .reconnect(table.session_id, table.absent_player)
            .unwrap();

        let (status, json) = open_vote(&table, "SKIP_TURN").await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "character_not_absent");
    }

    #[tokio::test]
    async fn test_initiate_vote_with_unknown_type_returns_422() {
        let table = table(2);

        let (status, _) = open_vote(&table, "BANISH").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_initiate_second_vote_returns_409() {
        let table = table(2);
        open_vote(&table, "SKIP_TURN").await;

        let (status, json) = open_vote(&table, "AI_CONTROL").await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "duplicate_active_vote");
    }

    #[tokio::test]
    async fn test_initiate_vote_without_voters_returns_422() {
        let table = table(0);
        let (status, json) = send(
            &table.state,
            "POST",
            &format!("/sessions/{}/absentee-votes", table.session_id),
            Some(serde_json::json!({
                "character_id": table.absent_character,
                "vote_type": "SKIP_TURN",
                "initiator_id": Uuid::new_v4(),
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "insufficient_eligible_voters");
    }

    #[tokio::test]
    async fn test_ballots_pass_vote_and_skip_turn_in_session() {
        // Arrange
        let table = table(2);
        table
            .state
            .sessions
            .start_round(table.session_id, vec![Uuid::new_v4(), table.absent_character])
            .unwrap();
        let (_, vote) = open_vote(&table, "SKIP_TURN").await;
        let vote_id = vote["vote_id"].as_str().unwrap().to_owned();

        // Act
        let (status, json) = send(
            &table.state,
            "POST",
            &format!("/absentee-votes/{vote_id}/ballots"),
            Some(serde_json::json!({ "voter_id": table.voters[1], "in_favor": true })),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "PASSED");
        assert_eq!(json["resolution_cause"], "quorum");
        let session = table.state.sessions.snapshot(table.session_id).unwrap();
        assert!(!session.pending.contains(&table.absent_character));
    }

    #[tokio::test]
    async fn test_ballot_from_ineligible_participant_returns_403() {
        let table = table(3);
        let (_, vote) = open_vote(&table, "SKIP_TURN").await;
        let vote_id = vote["vote_id"].as_str().unwrap().to_owned();

        let (status, json) = send(
            &table.state,
            "POST",
            &format!("/absentee-votes/{vote_id}/ballots"),
            Some(serde_json::json!({ "voter_id": Uuid::new_v4(), "in_favor": true })),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "voter_not_eligible");
    }

    #[tokio::test]
    async fn test_get_unknown_vote_returns_404() {
        let table = table(1);

        let (status, json) = send(
            &table.state,
            "GET",
            &format!("/absentee-votes/{}", Uuid::new_v4()),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "vote_not_found");
    }

    #[tokio::test]
    async fn test_list_active_votes_returns_open_votes() {
        let table = table(3);
        let (_, vote) = open_vote(&table, "AI_CONTROL").await;

        let (status, json) = send(
            &table.state,
            "GET",
            &format!("/sessions/{}/absentee-votes", table.session_id),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let votes = json["votes"].as_array().unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0]["vote_id"], vote["vote_id"]);
    }

    #[tokio::test]
    async fn test_list_active_votes_for_unknown_session_returns_404() {
        let table = table(1);

        let (status, _) = send(
            &table.state,
            "GET",
            &format!("/sessions/{}/absentee-votes", Uuid::new_v4()),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
