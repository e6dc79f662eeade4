//! HTTP route definitions.

use crate::server::handlers;
use crate::server::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the router.
///
/// ```text
/// GET  /               - API info
/// GET  /health         - Health check
/// POST /format/stream  - Format text or upload, progress as SSE
/// POST /format/text    - Format a JSON body
/// POST /format/file    - Format an upload
/// POST /download/word  - Wrap HTML as a .doc download
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.settings.server.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/format/stream", post(handlers::format_stream))
        .route("/format/text", post(handlers::format_text))
        .route("/format/file", post(handlers::format_file))
        .route("/download/word", post(handlers::download_word))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
