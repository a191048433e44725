//! Interactive chat streaming. Chat preempts background generation: every
//! tracked build task is cancelled (bounded wait) before the request takes
//! the generator, and a buffer check runs once the stream ends — whether
//! it completed, failed, or the client went away.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::constants::GENERATION_TEMPERATURE;
use crate::generation::BufferController;
use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(chat))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    prompt: String,
    system: Option<String>,
    temperature: Option<f32>,
}

/// Fires a buffer check when dropped, so background generation resumes
/// after the chat finishes or the connection dies mid-stream.
struct ResumeGuard {
    buffer: Arc<BufferController>,
}

impl Drop for ResumeGuard {
    fn drop(&mut self) {
        let buffer = self.buffer.clone();
        tokio::spawn(async move {
            buffer.check().await;
        });
    }
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if req.prompt.trim().is_empty() {
        return Err(AppError::bad_request("EMPTY_PROMPT", "prompt must not be empty"));
    }

    // Evict background builds before taking the generator.
    state.scheduler().preempt_for_chat().await;

    let guard = ResumeGuard {
        buffer: state.buffer().clone(),
    };

    let temperature = req.temperature.unwrap_or(GENERATION_TEMPERATURE);
    let upstream = state
        .backend()
        .generate_stream(&req.prompt, temperature, req.system.as_deref())
        .await?;

    let stream = async_stream::stream! {
        let _guard = guard;
        let mut upstream = upstream;
        while let Some(item) = upstream.next().await {
            match item {
                Ok(token) => {
                    let payload = serde_json::json!({ "token": token });
                    yield Ok(Event::default().event("token").data(payload.to_string()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Chat stream failed");
                    let payload = serde_json::json!({ "error": e.to_string() });
                    yield Ok(Event::default().event("error").data(payload.to_string()));
                    break;
                }
            }
        }
        yield Ok(Event::default().event("done").data("{}"));
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keepalive"),
    ))
}
