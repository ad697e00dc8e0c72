//! # Events
//!
//! The contract every value flowing through the bus satisfies, plus the
//! routing decision that selects ordered or unordered delivery.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

/// Correlation key attached to every event.
///
/// Error handlers receive it alongside each error so callers can match
/// failures back to the events they emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Reserved key used when no event was supplied.
    pub const UNIDENTIFIED: Self = Self(Uuid::nil());

    /// A fresh, process-unique identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// A stable identifier, usable in constants.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    #[must_use]
    pub fn is_unidentified(&self) -> bool {
        self.0.is_nil()
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unidentified() {
            write!(f, "unidentified")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Name of an ordering domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicId(Cow<'static, str>);

impl TopicId {
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for TopicId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for TopicId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an event is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Any dispatch pool worker, no ordering guarantee.
    Unordered,
    /// The topic's dedicated worker, in emission order.
    Ordered(TopicId),
}

impl Routing {
    #[must_use]
    pub fn topic(&self) -> Option<&TopicId> {
        match self {
            Routing::Unordered => None,
            Routing::Ordered(topic) => Some(topic),
        }
    }
}

/// A value that can be emitted on the bus.
///
/// Ownership moves into the bus on emission. Handlers only ever see a shared
/// reference for the duration of their call.
pub trait Event: Send + 'static {
    /// Correlation key reported with any error concerning this event.
    fn identifier(&self) -> Identifier;

    /// Routing decision, resolved once when the event is emitted.
    fn routing(&self) -> Routing {
        Routing::Unordered
    }
}
