//! # Mise Core
//!
//! Event-sourced ledger for a restaurant operations console.
//!
//! Every state change to a ticket (order progress, payment attempts and their
//! outcomes, recorded sales) is an immutable event appended to a single
//! in-memory log. Current state is never stored; it is projected on demand by
//! folding the log. Guard functions derived from projected state decide which
//! commands the console offers and accepts.
//!
//! ## Core Concepts
//!
//! - **Event**: a fact, [`event::LedgerEvent`], tagged and versioned
//! - **Event log**: [`event_store::EventLog`], append-only, sequence-numbered
//! - **Projection**: a pure fold from events to a view, [`projection::Projection`]
//! - **Guard**: a pure predicate over projected state, see [`lifecycle`]
//! - **Subscription**: change notification, see [`subscription`]
//! - **Environment**: injected time and id sources, see [`environment`]
//!
//! ## Architecture Principles
//!
//! - The log is the source of truth; projections are disposable
//! - Projections are deterministic: no clock, no randomness, no I/O
//! - The log records facts without judging them; guards gate the commands
//!   that produce them
//!
//! ## Example
//!
//! ```
//! use mise_core::event::{EventEnvelope, LedgerEvent, OrderConfirmed};
//! use mise_core::event_store::EventLog;
//! use mise_core::lifecycle::order::{available_commands, can_prepare};
//! use mise_core::projection::project;
//! use mise_core::stream::{EventId, TicketId};
//! use mise_core::Utc;
//!
//! let log = EventLog::new();
//! let ticket = TicketId::new("T-7");
//! log.append(EventEnvelope::new(
//!     EventId::new("e-1"),
//!     Utc::now(),
//!     LedgerEvent::OrderConfirmed(OrderConfirmed { ticket_id: ticket.clone() }),
//! ));
//!
//! let state = project(&log.get_all(), &ticket);
//! assert!(can_prepare(&state));
//! assert!(!available_commands(&state).is_empty());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod event;
pub mod event_store;
pub mod lifecycle;
pub mod projection;
pub mod stream;
pub mod subscription;
pub mod types;

/// Environment module - injected time and id sources
///
/// The command layer never calls `Utc::now()` or generates ids directly; it
/// asks the environment, so tests can pin both.
pub mod environment {
    use crate::stream::{EventId, SessionId};
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of fresh identifiers.
    ///
    /// Every call must return an id never returned before by the same
    /// generator.
    pub trait IdGenerator: Send + Sync {
        /// Id for a new event envelope.
        fn event_id(&self) -> EventId;

        /// Id for a new payment attempt.
        fn session_id(&self) -> SessionId;
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
