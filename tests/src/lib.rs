//! # Topic-Bus Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs      # Test events, handlers, error stores, wait group
//! │   └── integration/     # Bus flows end to end
//! │       ├── dispatch.rs  # Unordered pool delivery
//! │       ├── ordering.rs  # Topic FIFO and handler order
//! │       ├── lifecycle.rs # Initialize / shutdown / registry growth
//! │       └── errors.rs    # Error taxonomy and fan-out
//! └── benches/
//!     └── bus_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p topic-bus-tests
//!
//! # By category
//! cargo test -p topic-bus-tests integration::ordering::
//!
//! # Benchmarks
//! cargo bench -p topic-bus-tests
//! ```
