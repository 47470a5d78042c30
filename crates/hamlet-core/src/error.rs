//! Engine-level error types.

/// Errors raised by engine lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A lifecycle operation ran before `initialize()`.
    #[error("engine not initialized")]
    NotInitialized,

    /// `start()` was called while the tick loop is already running.
    #[error("engine already running")]
    AlreadyRunning,

    /// `start()` requires at least one map and one character.
    #[error("cannot start with {maps} maps and {characters} characters")]
    EmptyWorld {
        /// Loaded map count.
        maps: usize,
        /// Loaded character count.
        characters: usize,
    },

    /// The engine was stopped and cannot be restarted.
    #[error("engine stopped")]
    Stopped,

    /// The engine's internal lock was poisoned.
    #[error("engine lock poisoned: {context}")]
    Poisoned {
        /// Which operation observed the poisoned lock.
        context: String,
    },

    /// The clock configuration was invalid.
    #[error(transparent)]
    Clock(#[from] crate::clock::ClockError),
}

/// A control command failed validation.
#[derive(Debug, thiserror::Error)]
#[error("invalid control action {raw:?}")]
pub struct ValidationError {
    /// The rejected input.
    pub raw: String,
}
