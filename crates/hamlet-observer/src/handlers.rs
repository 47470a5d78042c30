//! REST handlers: state read and control commands.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use hamlet_core::ControlAction;

use crate::state::AppState;

/// `GET /api/state` — current snapshot plus engine metadata.
pub async fn get_state(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.get_state() {
        Ok((snapshot, meta)) => Json(json!({
            "state": snapshot,
            "meta": meta,
        }))
        .into_response(),
        Err(e) => internal_error(&e),
    }
}

/// Body of a control command.
#[derive(Debug, Deserialize)]
pub struct ControlBody {
    /// One of `pause`, `unpause`, `toggle`, `start`, `stop`.
    pub action: String,
}

/// `POST /api/control` — apply a control command.
pub async fn control(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ControlBody>,
) -> Response {
    let action = match ControlAction::parse(&body.action) {
        Ok(action) => action,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };

    info!(?action, "control command");
    match state.engine.control(action) {
        Ok(outcome) => Json(json!({
            "isPaused": outcome.is_paused,
            "isRunning": outcome.is_running,
        }))
        .into_response(),
        Err(e) => internal_error(&e),
    }
}

/// `GET /` — minimal status page.
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let outcome = state.engine.control_outcome();
    axum::response::Html(format!(
        "<html><body><h1>hamlet</h1>\
         <p>running: {} | paused: {}</p>\
         <p><a href=\"/api/state\">state</a> | <a href=\"/api/stream\">stream</a></p>\
         </body></html>",
        outcome.is_running, outcome.is_paused
    ))
    .into_response()
}

/// Map an engine error onto a 500 response.
fn internal_error(e: &dyn std::error::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
        .into_response()
}
