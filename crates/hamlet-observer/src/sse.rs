//! The SSE state/log stream.
//!
//! Each connected client gets the current world snapshot as its first
//! event, then every snapshot and log entry as they are published. A
//! client lagging past the broadcast capacity skips to the newest
//! event rather than disconnecting.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast;
use tracing::debug;

use crate::state::{AppState, StreamEvent};

/// `GET /api/stream` — combined state and log stream.
pub async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();

    // The contract guarantees the first message is the current state.
    let initial = state
        .engine
        .get_state()
        .map(|(snapshot, _meta)| StreamEvent::State(snapshot))
        .ok();

    debug!("stream client connected");

    let head = futures::stream::iter(initial.into_iter().map(|ev| Ok(to_sse_event(&ev))));
    let tail = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(ev) => return Some((Ok(to_sse_event(&ev)), rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "stream client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(futures::StreamExt::chain(head, tail))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// Serialize a stream event into an SSE frame.
fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_e| Event::default().comment("serialization failed"))
}
