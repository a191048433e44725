pub mod audio;
pub mod chat;
pub mod content;
pub mod health;
pub mod realtime;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware::request_id;
use crate::state::AppState;

/// Maximum request body size: 1 MiB; payloads here are small JSON bodies.
const MAX_BODY_SIZE: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/session", sessions::router().merge(realtime::router()))
        .nest("/chat", chat::router())
        .nest("/audio", audio::router())
        .merge(content::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    // Static SPA with index fallback.
    let spa_fallback =
        ServeDir::new("static").not_found_service(ServeFile::new("static/index.html"));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback_service(spa_fallback)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}
