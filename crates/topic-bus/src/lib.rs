//! # Topic Bus - In-Process Event Dispatch
//!
//! A publish/subscribe bus that fans events out to a fixed sequence of
//! handlers, with two delivery disciplines:
//!
//! - **Unordered:** events without a topic go to a shared queue consumed by a
//!   fixed pool of threads. Maximal parallelism, no ordering.
//! - **Ordered:** events with a topic go to that topic's dedicated worker and
//!   are handled strictly in emission order. Topic workers are created on
//!   first use.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!   emit(event) ──►│     Bus      │── validation failure ──► ErrorHandlers
//!                  └──────┬───────┘
//!            Unordered    │    Ordered(topic)
//!          ┌──────────────┴──────────────┐
//!          ▼                             ▼
//!  ┌───────────────┐            ┌─────────────────┐
//!  │ DispatchPool  │            │  TopicRegistry  │
//!  │ shared queue  │            │ topic ► worker  │
//!  └───┬───┬───┬───┘            └───┬─────────┬───┘
//!      ▼   ▼   ▼                    ▼         ▼
//!   worker threads (N)        TopicWorker  TopicWorker
//!      │                        (FIFO)       (FIFO)
//!      └───────────► Handlers, in registration order
//!                         │ failure
//!                         ▼
//!                   ErrorHandlers (fan-out)
//! ```
//!
//! ## Lifecycle
//!
//! `Created → Configuring → Initialized → Draining → Terminated`. Configuration
//! is frozen by [`Bus::initialize`]; [`Bus::shutdown`] drains every queue and
//! leaves the bus terminal.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use topic_bus::{Bus, Event, Handler, HandlerError, Identifier, Routing, TopicId};
//!
//! struct OrderPlaced {
//!     id: Identifier,
//!     customer: String,
//! }
//!
//! impl Event for OrderPlaced {
//!     fn identifier(&self) -> Identifier {
//!         self.id
//!     }
//!
//!     fn routing(&self) -> Routing {
//!         Routing::Ordered(TopicId::from(format!("customer:{}", self.customer)))
//!     }
//! }
//!
//! struct Audit;
//!
//! impl Handler<OrderPlaced> for Audit {
//!     fn handle(&self, event: &OrderPlaced) -> Result<(), HandlerError> {
//!         println!("order {} for {}", event.id, event.customer);
//!         Ok(())
//!     }
//! }
//!
//! let bus: Bus<OrderPlaced> = Bus::new();
//! bus.set_pool_size(2);
//! bus.initialize(vec![Arc::new(Audit)])?;
//! bus.emit(OrderPlaced { id: Identifier::random(), customer: "ada".into() });
//! bus.shutdown();
//! # Ok::<(), topic_bus::BusError>(())
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod sync;

mod pool;
mod topic;
mod worker;

// Re-export main types
pub use bus::{Bus, BusState};
pub use config::BusConfig;
pub use error::{BusError, HandlerError};
pub use event::{Event, Identifier, Routing, TopicId};
pub use handler::{ErrorHandler, Handler};
pub use sync::{Counter, Flag};

/// Default initial capacity of the topic registry.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 10;

/// Default capacity of every queue before emitters block.
pub const DEFAULT_QUEUE_BUFFER: usize = 100;
