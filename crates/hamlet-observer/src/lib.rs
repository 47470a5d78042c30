//! Observer API server (Axum HTTP + SSE) for the Hamlet simulation.
//!
//! A thin surface over the engine: a state endpoint, a control
//! endpoint, and a server-sent-events stream that relays the engine's
//! snapshot and log fan-out to connected clients.

pub mod handlers;
pub mod router;
pub mod server;
pub mod sse;
pub mod state;

pub use router::build_router;
pub use server::{start_server, start_server_with_shutdown, ServerConfig, ServerError};
pub use state::{AppState, StreamEvent};
