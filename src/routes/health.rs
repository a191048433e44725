use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/ready", get(ready))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": state.uptime_secs(),
    }))
}

async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    // Readiness hinges on the store answering queries.
    let clusters = state.store().count_clusters()?;
    Ok(Json(serde_json::json!({
        "status": "ready",
        "clusters": clusters,
        "generation_backend": state.backend().id(),
    })))
}
