use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::AppError;
use crate::session::NextOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_session))
        .route("/answer", post(answer))
        .route("/next", post(next_question))
        .route("/current/:session_id", get(current))
        .route("/finish", post(finish))
        .route("/history", get(history))
}

fn outcome_response(outcome: NextOutcome) -> Json<serde_json::Value> {
    match outcome {
        NextOutcome::Question(wire) => Json(serde_json::to_value(*wire).unwrap_or_default()),
        NextOutcome::Waiting(progress) => Json(serde_json::json!({
            "session_id": progress.session_id,
            "session_complete": false,
            "generating": true,
            "progress": progress,
        })),
        NextOutcome::Complete {
            session_id,
            summary,
        } => Json(serde_json::json!({
            "session_id": session_id,
            "session_complete": true,
            "summary": summary,
        })),
    }
}

async fn start_session(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let outcome = state.manager().start().await?;
    Ok(outcome_response(outcome))
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    session_id: i64,
    selected_index: usize,
    response_time_ms: Option<u64>,
}

async fn answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .manager()
        .answer(req.session_id, req.selected_index, req.response_time_ms)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct SessionRequest {
    session_id: i64,
}

async fn next_question(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.manager().next_question(req.session_id).await?;
    Ok(outcome_response(outcome))
}

async fn current(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.manager().current(session_id).await?;
    Ok(outcome_response(outcome))
}

async fn finish(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.manager().finish(req.session_id).await?;
    Ok(Json(serde_json::json!({
        "session_id": req.session_id,
        "session_complete": true,
        "summary": summary,
    })))
}

async fn history(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sessions = state.store().get_session_history(20)?;
    Ok(Json(serde_json::json!({ "sessions": sessions })))
}
