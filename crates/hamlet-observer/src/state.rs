//! Shared application state for the observer server.
//!
//! [`AppState`] bridges the engine's synchronous subscriber fan-out
//! into a tokio broadcast channel the SSE handler can consume. The
//! engine-side subscriptions live as long as the state does.

use std::sync::Arc;

use hamlet_core::publish::Subscription;
use hamlet_core::Engine;
use hamlet_types::{ActivityLogEntry, WorldSnapshot};
use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel feeding SSE clients.
///
/// A client lagging by more than this many events skips ahead to the
/// newest one.
const BROADCAST_CAPACITY: usize = 256;

/// One event on the combined state/log stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamEvent {
    /// A world snapshot.
    State(WorldSnapshot),
    /// An activity log entry.
    Log(ActivityLogEntry),
}

/// Shared state for the axum application.
pub struct AppState {
    /// The engine under observation.
    pub engine: Arc<Engine>,
    /// Broadcast sender for stream events.
    pub tx: broadcast::Sender<StreamEvent>,
    /// Engine-side subscription handles (kept alive, cancelled on
    /// drop of the server).
    _subscriptions: (Subscription<WorldSnapshot>, Subscription<ActivityLogEntry>),
}

impl AppState {
    /// Wire an app state to the engine's publishers.
    pub fn attach(engine: Arc<Engine>) -> Result<Arc<Self>, hamlet_core::EngineError> {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);

        let state_tx = tx.clone();
        let state_sub = engine.subscribe(move |snapshot| {
            // Zero receivers just means no client is connected.
            let _ = state_tx.send(StreamEvent::State(snapshot.clone()));
        })?;

        let log_tx = tx.clone();
        let log_sub = engine.subscribe_to_logs(move |entry| {
            let _ = log_tx.send(StreamEvent::Log(entry.clone()));
        });

        Ok(Arc::new(Self {
            engine,
            tx,
            _subscriptions: (state_sub, log_sub),
        }))
    }

    /// Subscribe to the combined event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }
}
