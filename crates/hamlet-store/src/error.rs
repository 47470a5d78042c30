//! Store error type.

/// Errors raised by [`StateStore`](crate::StateStore) implementations.
///
/// Store failures are absorbed by the engine: they are logged and the
/// write is retried at the next persistence boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store's internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {context}")]
    Poisoned {
        /// Which operation observed the poisoned lock.
        context: String,
    },

    /// A backend-specific failure (I/O, serialization, connection).
    #[error("store backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}
