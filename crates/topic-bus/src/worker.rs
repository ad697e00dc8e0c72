//! # Queue Consumers
//!
//! The loop shared by dispatch pool threads and topic workers, and the
//! enqueue path with optional bounded waiting.

use crate::error::BusError;
use crate::event::Event;
use crate::handler::Dispatcher;
use flume::{Receiver, SendTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Message carried by every bus queue.
pub(crate) enum Command<E> {
    Deliver(E),
    /// Stop the consumer once everything queued ahead of it is processed.
    Stop,
}

/// Consume `queue` until a stop command, then acknowledge on `done`.
pub(crate) fn consume<E: Event>(
    worker: &str,
    queue: Receiver<Command<E>>,
    dispatcher: Arc<Dispatcher<E>>,
    done: Sender<()>,
) {
    debug!(worker, "Worker started");
    while let Ok(command) = queue.recv() {
        match command {
            Command::Deliver(event) => dispatcher.deliver(&event),
            Command::Stop => break,
        }
    }
    debug!(worker, "Worker shutting down");
    let _ = done.send(());
}

/// Push an event, blocking while the queue is full.
///
/// With a timeout the wait is bounded. On failure the unsent command is
/// handed back with the error to report.
pub(crate) fn enqueue<E>(
    queue: &Sender<Command<E>>,
    event: E,
    timeout: Option<Duration>,
) -> Result<(), (Command<E>, BusError)> {
    let command = Command::Deliver(event);
    let Some(timeout) = timeout else {
        return queue
            .send(command)
            .map_err(|err| (err.0, BusError::ShuttingDown));
    };

    queue.send_timeout(command, timeout).map_err(|err| match err {
        SendTimeoutError::Timeout(command) => (command, BusError::EmitTimedOut { timeout }),
        SendTimeoutError::Disconnected(command) => (command, BusError::ShuttingDown),
    })
}
