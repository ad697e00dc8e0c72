//! Bus configuration
//!
//! # Example
//!
//! ```
//! use topic_bus::BusConfig;
//!
//! let config = BusConfig {
//!     pool_size: 4,
//!     ..BusConfig::default()
//! };
//! assert_eq!(config.registry_capacity, 10);
//! ```

use crate::{DEFAULT_QUEUE_BUFFER, DEFAULT_REGISTRY_CAPACITY};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables read once, when the bus is initialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Number of dispatch pool threads
    pub pool_size: usize,
    /// Initial capacity of the topic registry
    pub registry_capacity: usize,
    /// Capacity of every queue (pool and per-topic)
    pub queue_buffer: usize,
    /// How long an emit may wait on a full queue; `None` waits forever
    pub emit_timeout_ms: Option<u64>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            pool_size: num_cpus::get(),
            registry_capacity: DEFAULT_REGISTRY_CAPACITY,
            queue_buffer: DEFAULT_QUEUE_BUFFER,
            emit_timeout_ms: None,
        }
    }
}

impl BusConfig {
    #[must_use]
    pub fn emit_timeout(&self) -> Option<Duration> {
        self.emit_timeout_ms.map(Duration::from_millis)
    }
}
