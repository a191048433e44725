//! Live session progress over SSE.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;

use crate::constants::PROGRESS_TICK_SECS;
use crate::response::AppError;
use crate::session::snapshot::ProgressSnapshot;
use crate::state::AppState;

static SSE_CONNECTION_COUNT: AtomicUsize = AtomicUsize::new(0);

struct SseGuard;
impl Drop for SseGuard {
    fn drop(&mut self) {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:session_id/events", get(progress_events))
}

/// Emit a progress snapshot whenever it changes, ending the stream when
/// the session completes or the server shuts down. Clients may reconnect
/// and observe the same session state.
async fn progress_events(
    Path(session_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let max_sse = state.config().limits.max_sse_connections;
    let current = SSE_CONNECTION_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= max_sse {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests("Too many progress streams"));
    }

    let mut shutdown_rx = state.shutdown_rx();

    let stream = async_stream::stream! {
        let _guard = SseGuard;
        let mut interval = tokio::time::interval(Duration::from_secs(PROGRESS_TICK_SECS));
        let mut last: Option<ProgressSnapshot> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match state.manager().progress(session_id).await {
                        Ok(snapshot) => {
                            if last.as_ref() != Some(&snapshot) {
                                if let Ok(json) = serde_json::to_string(&snapshot) {
                                    yield Ok(Event::default().event("progress").data(json));
                                }
                                last = Some(snapshot);
                            }
                        }
                        Err(_) => {
                            // Session gone: either finished or never existed.
                            let end = serde_json::json!({
                                "session_id": session_id,
                                "session_complete": true,
                            });
                            yield Ok(Event::default()
                                .event("session_end")
                                .data(end.to_string()));
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
