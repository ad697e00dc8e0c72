//! # Handlers
//!
//! Defines the consumer side of the bus: event handlers, error handlers, and
//! the frozen dispatch table every worker shares.

use crate::error::{BusError, HandlerError};
use crate::event::{Event, Identifier};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

/// Trait for processing events delivered by the bus.
pub trait Handler<E>: Send + Sync {
    /// Whether this handler wants to see `event`.
    fn listens_to(&self, _event: &E) -> bool {
        true
    }

    /// Process an event.
    ///
    /// # Errors
    ///
    /// Any error is reported to the bus error handlers as
    /// [`BusError::HandlerFailure`]; later handlers still run.
    fn handle(&self, event: &E) -> Result<(), HandlerError>;

    /// Name used in errors and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Trait for receiving errors raised while admitting or processing events.
///
/// Runs inline on the thread that detected the error, so it must not block
/// indefinitely.
pub trait ErrorHandler<E>: Send + Sync {
    /// `event` is `None` when no event was supplied; `id` is then
    /// [`Identifier::UNIDENTIFIED`].
    fn handle(&self, id: Identifier, event: Option<&E>, error: &BusError);
}

/// Handler and error-handler sequences, fixed at initialization.
pub(crate) struct Dispatcher<E> {
    handlers: Vec<Arc<dyn Handler<E>>>,
    error_handlers: Vec<Arc<dyn ErrorHandler<E>>>,
}

impl<E: Event> Dispatcher<E> {
    pub(crate) fn new(
        handlers: Vec<Arc<dyn Handler<E>>>,
        error_handlers: Vec<Arc<dyn ErrorHandler<E>>>,
    ) -> Self {
        Self {
            handlers,
            error_handlers,
        }
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Run every interested handler over `event`, in registration order.
    pub(crate) fn deliver(&self, event: &E) {
        for handler in &self.handlers {
            if !handler.listens_to(event) {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => BusError::HandlerFailure {
                    handler: handler.name().to_string(),
                    source,
                },
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(handler = handler.name(), %message, "Handler panicked");
                    BusError::HandlerPanicked {
                        handler: handler.name().to_string(),
                        message,
                    }
                }
            };
            self.report(event.identifier(), Some(event), &error);
        }
    }

    /// Fan `error` out to every error handler.
    pub(crate) fn report(&self, id: Identifier, event: Option<&E>, error: &BusError) {
        report_to(&self.error_handlers, id, event, error);
    }
}

pub(crate) fn report_to<E>(
    error_handlers: &[Arc<dyn ErrorHandler<E>>],
    id: Identifier,
    event: Option<&E>,
    error: &BusError,
) {
    if error_handlers.is_empty() {
        trace!(%id, %error, "No error handlers registered, error discarded");
        return;
    }
    for error_handler in error_handlers {
        error_handler.handle(id, event, error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
