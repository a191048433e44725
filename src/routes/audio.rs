//! Serve cached narration audio by sentence hash.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:file", get(serve_audio))
}

async fn serve_audio(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let hash = file.strip_suffix(".mp3").unwrap_or(&file);
    if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AppError::bad_request("BAD_AUDIO_HASH", "Malformed audio hash"));
    }

    let entry = state
        .store()
        .get_audio_cache(hash)?
        .ok_or_else(|| AppError::not_found("Audio not found"))?;

    let bytes = tokio::fs::read(&entry.file_path)
        .await
        .map_err(|_| AppError::not_found("Audio not found"))?;

    Ok((
        [(header::CONTENT_TYPE, "audio/mpeg")],
        bytes,
    )
        .into_response())
}
