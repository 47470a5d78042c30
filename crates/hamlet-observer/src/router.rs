//! Axum router construction.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::sse;
use crate::state::AppState;

/// Build the observer router:
///
/// - `GET /` — minimal HTML status page
/// - `GET /api/state` — current snapshot plus engine metadata
/// - `POST /api/control` — pause/unpause/toggle/start/stop
/// - `GET /api/stream` — SSE state and log stream
///
/// CORS allows any origin for development dashboards.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/state", get(handlers::get_state))
        .route("/api/control", post(handlers::control))
        .route("/api/stream", get(sse::stream))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
