//! Stats, rotation management, and manual generation.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/words/active", get(active_words))
        .route("/words/archived", get(archived_words))
        .route("/words/archive", post(archive_word))
        .route("/words/restore", post(restore_word))
        .route("/words/reset-due", post(reset_word_due))
        .route("/generate", post(generate_batch))
}

async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store().get_stats()?))
}

async fn active_words(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let pairs = state.store().get_active_pairs()?;
    Ok(Json(serde_json::json!({ "pairs": pairs })))
}

async fn archived_words(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let pairs = state.store().get_archived_pairs()?;
    Ok(Json(serde_json::json!({ "pairs": pairs })))
}

#[derive(Debug, Deserialize)]
struct PairRequest {
    word: String,
    cluster_title: String,
}

async fn archive_word(
    State(state): State<AppState>,
    Json(req): Json<PairRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .store()
        .set_word_archived(&req.word, &req.cluster_title, true)?;
    // Archival shrinks the serveable pool; re-check the buffer.
    state.buffer().check().await;
    Ok(Json(serde_json::json!({ "archived": true })))
}

async fn restore_word(
    State(state): State<AppState>,
    Json(req): Json<PairRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .store()
        .set_word_archived(&req.word, &req.cluster_title, false)?;
    state.buffer().check().await;
    Ok(Json(serde_json::json!({ "archived": false })))
}

async fn reset_word_due(
    State(state): State<AppState>,
    Json(req): Json<PairRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .store()
        .reset_word_due(&req.word, &req.cluster_title)?;
    Ok(Json(serde_json::json!({ "reset": true })))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    count: Option<usize>,
}

/// Generate a batch on demand. Takes the generator interactively, so
/// running background builds are preempted first.
async fn generate_batch(
    State(state): State<AppState>,
    body: Option<Json<GenerateRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let requested = body.and_then(|Json(b)| b.count).unwrap_or(10);
    let count = requested.min(state.config().limits.max_generation_batch);

    state.scheduler().preempt_for_chat().await;

    let mut generated = 0usize;
    for _ in 0..count {
        match state.builder().build(None).await {
            Ok(Some(question)) => {
                state.store().save_question(&question)?;
                generated += 1;
            }
            Ok(None) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    state.buffer().check().await;

    Ok(Json(serde_json::json!({
        "generated": generated,
        "bank_size": state.store().count_questions()?,
    })))
}
