//! Error types for the event bus

use std::time::Duration;
use thiserror::Error;

/// Error returned by a handler that failed to process an event.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors originating from the event bus.
///
/// Emission errors are never returned to the emitting caller; they are fanned
/// out to every registered error handler instead.
#[derive(Debug, Error)]
pub enum BusError {
    /// An absent event was submitted.
    #[error("event: invalid event")]
    InvalidEvent,

    /// An event was emitted before the bus was initialized.
    #[error("event: the bus is not initialized")]
    NotInitialized,

    /// An event was emitted after shutdown began.
    #[error("event: the bus is shutting down")]
    ShuttingDown,

    /// A handler reported failure for an event.
    #[error("event: handler {handler} failed: {source}")]
    HandlerFailure {
        handler: String,
        #[source]
        source: HandlerError,
    },

    /// A handler panicked while processing an event.
    #[error("event: handler {handler} panicked: {message}")]
    HandlerPanicked { handler: String, message: String },

    /// The target queue stayed full for the whole emit timeout.
    #[error("event: queue full, emit timed out after {timeout:?}")]
    EmitTimedOut { timeout: Duration },

    /// A worker thread could not be started.
    #[error("event: failed to spawn worker {worker}: {source}")]
    WorkerSpawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },
}

impl BusError {
    /// Whether the error was raised while processing the event, as opposed to
    /// while admitting it onto the bus.
    #[must_use]
    pub fn is_handler_error(&self) -> bool {
        matches!(
            self,
            BusError::HandlerFailure { .. } | BusError::HandlerPanicked { .. }
        )
    }
}
