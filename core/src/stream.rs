//! Identifier and ordering types for the ledger.
//!
//! Tickets, payment sessions, customers and events are identified by string
//! newtypes. The log itself is ordered by [`Sequence`], which the store assigns
//! on append; timestamps are informational only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for identifier parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind}: identifier cannot be empty")]
pub struct ParseIdError {
    kind: &'static str,
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier without validation (trusted input).
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert the identifier into its inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim().is_empty() {
                    return Err(ParseIdError { kind: $kind });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifies a ticket (one order at the point of sale).
    ///
    /// ```
    /// use mise_core::stream::TicketId;
    ///
    /// let ticket = TicketId::new("T-104");
    /// assert_eq!(ticket.as_str(), "T-104");
    /// ```
    TicketId,
    "ticket id"
);

string_id!(
    /// Identifies one payment attempt. Every attempt carries a fresh session.
    SessionId,
    "session id"
);

string_id!(
    /// Identifies a customer attached to a sale.
    CustomerId,
    "customer id"
);

string_id!(
    /// Unique identifier of a single event record.
    EventId,
    "event id"
);

/// Position of an event in the log.
///
/// Sequences start at 1 and increase by exactly one per append. They are the
/// authoritative ordering of the log; two events with the same timestamp are
/// ordered by sequence.
///
/// ```
/// use mise_core::stream::Sequence;
///
/// let first = Sequence::FIRST;
/// assert_eq!(first.next(), Sequence::new(2));
/// assert!(first < first.next());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(u64);

impl Sequence {
    /// Sequence of the first event appended to an empty (or reset) log.
    pub const FIRST: Self = Self(1);

    /// Create a sequence from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw sequence number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The sequence that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<Sequence> for u64 {
    fn from(sequence: Sequence) -> Self {
        sequence.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if parse fails
    fn parse_ticket_id() {
        let id: TicketId = "T-1".parse().expect("parse should succeed");
        assert_eq!(id, TicketId::new("T-1"));
    }

    #[test]
    fn parse_blank_id_fails() {
        let err = "  ".parse::<SessionId>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid session id: identifier cannot be empty");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&TicketId::new("T-9")).unwrap_or_default();
        assert_eq!(json, "\"T-9\"");
    }

    #[test]
    fn sequence_ordering_and_display() {
        let s = Sequence::FIRST;
        assert_eq!(s.value(), 1);
        assert!(s.next() > s);
        assert_eq!(format!("{}", s.next()), "#2");
        assert_eq!(u64::from(Sequence::new(7)), 7);
    }
}
