//! # Bus
//!
//! The facade callers interact with: configuration, lifecycle, validation,
//! routing, and error fan-out.
//!
//! ```text
//! emit(event)
//!     │
//!     ├─ absent?             ─► InvalidEvent      ─► error handlers
//!     ├─ not initialized?    ─► NotInitialized    ─► error handlers
//!     ├─ shutting down?      ─► ShuttingDown      ─► error handlers
//!     │
//!     ├─ Routing::Ordered(t) ─► TopicRegistry ─► TopicWorker(t) queue
//!     └─ Routing::Unordered  ─► DispatchPool queue
//! ```

use crate::config::BusConfig;
use crate::error::BusError;
use crate::event::{Event, Identifier, Routing, TopicId};
use crate::handler::{report_to, Dispatcher, ErrorHandler, Handler};
use crate::pool::DispatchPool;
use crate::sync::{Counter, Flag};
use crate::topic::TopicRegistry;
use crate::worker::{enqueue, Command};
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Observable lifecycle of a [`Bus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// Constructed, defaults untouched.
    Created,
    /// At least one configuration change applied.
    Configuring,
    /// Accepting events.
    Initialized,
    /// Shutdown started, workers draining.
    Draining,
    /// Every worker acknowledged shutdown. Terminal.
    Terminated,
}

struct Settings<E> {
    config: BusConfig,
    error_handlers: Vec<Arc<dyn ErrorHandler<E>>>,
}

/// Everything created by `initialize`.
struct Runtime<E> {
    dispatcher: Arc<Dispatcher<E>>,
    pool: DispatchPool<E>,
    topics: Mutex<TopicRegistry<E>>,
    emit_timeout: Option<Duration>,
}

impl<E: Event> Runtime<E> {
    fn route(&self, event: E) -> Result<(), (Command<E>, BusError)> {
        match event.routing() {
            Routing::Unordered => enqueue(self.pool.sender(), event, self.emit_timeout),
            Routing::Ordered(topic) => {
                // The registry lock is released before a possibly blocking send.
                let sender = self.topics.lock().sender_for(&topic);
                match sender {
                    Ok(sender) => enqueue(&sender, event, self.emit_timeout),
                    Err(err) => {
                        error!(%topic, error = %err, "Failed to start topic worker");
                        Err((Command::Deliver(event), err))
                    }
                }
            }
        }
    }
}

/// In-process event bus.
///
/// Events without a topic are spread over a fixed dispatch pool; events with
/// a topic are handled one at a time, in emission order, by that topic's
/// worker. Errors never surface from [`Bus::emit`]; they are delivered to the
/// registered [`ErrorHandler`]s.
///
/// The bus is terminal after [`Bus::shutdown`]: it cannot be initialized
/// again, and a new bus is required to restart.
///
/// Share it between threads behind an `Arc`. [`Bus::shutdown`] must not be
/// called from inside a handler.
pub struct Bus<E: Event> {
    settings: RwLock<Settings<E>>,
    configured: Flag,
    initialized: Flag,
    shutting_down: Flag,
    terminated: Flag,
    /// Emits currently between validation and enqueue.
    in_flight: InFlightGate,
    /// Serializes initialize and shutdown.
    lifecycle: Mutex<()>,
    runtime: OnceLock<Runtime<E>>,
}

impl<E: Event> Bus<E> {
    /// Create a bus with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            settings: RwLock::new(Settings {
                config,
                error_handlers: Vec::new(),
            }),
            configured: Flag::new(),
            initialized: Flag::new(),
            shutting_down: Flag::new(),
            terminated: Flag::new(),
            in_flight: InFlightGate::default(),
            lifecycle: Mutex::new(()),
            runtime: OnceLock::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Configuration: every setter is silently ignored once initialized.
    // -------------------------------------------------------------------------

    pub fn set_pool_size(&self, pool_size: usize) {
        self.update(|settings| settings.config.pool_size = pool_size);
    }

    pub fn set_registry_capacity(&self, registry_capacity: usize) {
        self.update(|settings| settings.config.registry_capacity = registry_capacity);
    }

    pub fn set_queue_buffer(&self, queue_buffer: usize) {
        self.update(|settings| settings.config.queue_buffer = queue_buffer);
    }

    /// Bound how long an emit may wait on a full queue. `None` waits forever.
    pub fn set_emit_timeout(&self, timeout: Option<Duration>) {
        let millis = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self.update(|settings| settings.config.emit_timeout_ms = millis);
    }

    /// Replace every tunable at once. Error handlers are kept.
    pub fn configure(&self, config: BusConfig) {
        self.update(|settings| settings.config = config);
    }

    /// Append an error handler. Error handlers run in the order added.
    pub fn add_error_handler(&self, error_handler: Arc<dyn ErrorHandler<E>>) {
        self.update(|settings| settings.error_handlers.push(error_handler));
    }

    /// Snapshot of the current configuration.
    #[must_use]
    pub fn config(&self) -> BusConfig {
        self.settings.read().config.clone()
    }

    fn update(&self, apply: impl FnOnce(&mut Settings<E>)) {
        let mut settings = self.settings.write();
        if self.initialized.is_enabled() {
            debug!("Configuration change ignored, bus already initialized");
            return;
        }
        apply(&mut settings);
        self.configured.enable();
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Freeze `handlers` and start the dispatch pool.
    ///
    /// One-shot: later calls, and calls after shutdown, are no-ops. Handlers
    /// see each event in the order given here.
    ///
    /// # Errors
    ///
    /// [`BusError::WorkerSpawn`] if a pool thread cannot be started. The bus
    /// is then left uninitialized.
    pub fn initialize(&self, handlers: Vec<Arc<dyn Handler<E>>>) -> Result<(), BusError> {
        let _lifecycle = self.lifecycle.lock();
        if self.shutting_down.is_enabled() {
            warn!("Initialize ignored, the bus has been shut down");
            return Ok(());
        }

        let (config, error_handlers) = {
            let settings = self.settings.read();
            if !self.initialized.enable() {
                debug!("Initialize ignored, bus already initialized");
                return Ok(());
            }
            (settings.config.clone(), settings.error_handlers.clone())
        };

        let dispatcher = Arc::new(Dispatcher::new(handlers, error_handlers));
        let pool = match DispatchPool::start(config.pool_size, config.queue_buffer, dispatcher.clone())
        {
            Ok(pool) => pool,
            Err(err) => {
                error!(error = %err, "Failed to start dispatch pool");
                self.initialized.disable();
                return Err(err);
            }
        };

        let runtime = Runtime {
            topics: Mutex::new(TopicRegistry::new(
                config.registry_capacity,
                config.queue_buffer,
                dispatcher.clone(),
            )),
            dispatcher,
            pool,
            emit_timeout: config.emit_timeout(),
        };
        let handlers = runtime.dispatcher.handler_count();
        if let Err(runtime) = self.runtime.set(runtime) {
            runtime.pool.shutdown();
            return Ok(());
        }

        info!(
            pool_size = config.pool_size,
            registry_capacity = config.registry_capacity,
            queue_buffer = config.queue_buffer,
            handlers,
            "Bus initialized"
        );
        Ok(())
    }

    /// Emit an event. Never fails synchronously; see [`Bus::submit`].
    pub fn emit(&self, event: E) {
        self.submit(Some(event));
    }

    /// Submit a possibly absent event.
    ///
    /// Blocks while the target queue is full, up to the configured emit
    /// timeout if one is set. Rejections are reported to the error handlers:
    /// an absent event as [`BusError::InvalidEvent`] under
    /// [`Identifier::UNIDENTIFIED`], then [`BusError::NotInitialized`], then
    /// [`BusError::ShuttingDown`].
    pub fn submit(&self, event: Option<E>) {
        let Some(event) = event else {
            self.reject(Identifier::UNIDENTIFIED, None, &BusError::InvalidEvent);
            return;
        };

        if let Err((Command::Deliver(event), err)) = self.admit(event) {
            self.reject(event.identifier(), Some(&event), &err);
        }
    }

    fn admit(&self, event: E) -> Result<(), (Command<E>, BusError)> {
        let Some(runtime) = self.runtime.get() else {
            return Err((Command::Deliver(event), BusError::NotInitialized));
        };

        let _in_flight = self.in_flight.enter();
        if self.shutting_down.is_enabled() {
            return Err((Command::Deliver(event), BusError::ShuttingDown));
        }
        runtime.route(event)
    }

    fn reject(&self, id: Identifier, event: Option<&E>, err: &BusError) {
        warn!(%id, error = %err, "Event rejected");
        match self.runtime.get() {
            Some(runtime) => runtime.dispatcher.report(id, event, err),
            None => {
                let error_handlers = self.settings.read().error_handlers.clone();
                report_to(&error_handlers, id, event, err);
            }
        }
    }

    /// Stop accepting events and wait for every queued event to be handled.
    ///
    /// Idempotent. Concurrent callers all return once the drain completes.
    pub fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock();
        if !self.shutting_down.enable() {
            return;
        }
        info!("Bus shutting down");

        // Emits that passed the latch check before it was set finish enqueueing
        // before any stop command is sent.
        self.in_flight.wait_idle();

        if let Some(runtime) = self.runtime.get() {
            runtime.pool.shutdown();
            runtime.topics.lock().shutdown_all();
        }

        self.terminated.enable();
        info!("Bus terminated");
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> BusState {
        if self.terminated.is_enabled() {
            BusState::Terminated
        } else if self.shutting_down.is_enabled() {
            BusState::Draining
        } else if self.runtime.get().is_some() {
            BusState::Initialized
        } else if self.configured.is_enabled() {
            BusState::Configuring
        } else {
            BusState::Created
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.is_enabled()
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.is_enabled()
    }

    /// Dispatch pool threads still running.
    #[must_use]
    pub fn live_workers(&self) -> u32 {
        self.runtime
            .get()
            .map_or(0, |runtime| runtime.pool.live_workers())
    }

    /// Topic workers currently registered.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.runtime
            .get()
            .map_or(0, |runtime| runtime.topics.lock().len())
    }

    /// Current topic registry capacity; the configured one before
    /// initialization.
    #[must_use]
    pub fn topic_capacity(&self) -> usize {
        match self.runtime.get() {
            Some(runtime) => runtime.topics.lock().capacity(),
            None => self.settings.read().config.registry_capacity,
        }
    }

    /// Whether any topic worker is registered.
    #[must_use]
    pub fn has_topics(&self) -> bool {
        self.runtime
            .get()
            .is_some_and(|runtime| !runtime.topics.lock().is_empty())
    }

    #[must_use]
    pub fn has_topic(&self, topic: &TopicId) -> bool {
        self.runtime
            .get()
            .is_some_and(|runtime| runtime.topics.lock().contains(topic))
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.runtime
            .get()
            .map_or(0, |runtime| runtime.dispatcher.handler_count())
    }
}

impl<E: Event> Default for Bus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Drop for Bus<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Counts emits past the shutdown check and wakes shutdown when none remain.
#[derive(Default)]
struct InFlightGate {
    count: Counter,
    lock: Mutex<()>,
    idle: Condvar,
}

impl InFlightGate {
    fn enter(&self) -> InFlight<'_> {
        self.count.increment();
        InFlight(self)
    }

    fn wait_idle(&self) {
        let mut guard = self.lock.lock();
        while !self.count.is_zero() {
            self.idle.wait(&mut guard);
        }
    }
}

struct InFlight<'a>(&'a InFlightGate);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let gate = self.0;
        gate.count.decrement();
        if gate.count.is_zero() {
            // Taken so the notify cannot land between the check and the wait.
            let _guard = gate.lock.lock();
            gate.idle.notify_all();
        }
    }
}
