//! # Atomic Primitives
//!
//! One-shot latches and the live-worker counter shared by the bus and its
//! workers. All operations are sequentially consistent: the bus pairs a
//! latch with an in-flight counter and relies on a total order between them.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// A boolean latch safe under concurrent access.
///
/// Transitions are compare-and-swap based, so exactly one caller wins each
/// false→true (or true→false) transition.
#[derive(Debug, Default)]
pub struct Flag(AtomicBool);

impl Flag {
    /// Create a disabled flag.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Enable the flag.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn enable(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Disable the flag.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn disable(&self) -> bool {
        self.0
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Monotonic increment/decrement counter with a zero-test.
#[derive(Debug, Default)]
pub struct Counter(AtomicU32);

impl Counter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the counter.
    ///
    /// Never wraps below zero; returns `false` if the counter was already zero.
    pub fn decrement(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
            .is_ok()
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is(&self, value: u32) -> bool {
        self.get() == value
    }

    pub fn is_zero(&self) -> bool {
        self.is(0)
    }
}
