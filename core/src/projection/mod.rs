//! Projection engine: pure folds from the event log to current-state views.
//!
//! A projection never reads the clock, draws randomness or performs I/O while
//! folding, so replaying the same prefix of the log always yields the same
//! state. Projections are discarded and recomputed on change, never patched.
//!
//! # Example
//!
//! ```
//! use mise_core::event::{EventEnvelope, LedgerEvent, OrderConfirmed};
//! use mise_core::event_store::EventLog;
//! use mise_core::lifecycle::OrderStatus;
//! use mise_core::projection::project;
//! use mise_core::stream::{EventId, TicketId};
//! use chrono::Utc;
//!
//! let log = EventLog::new();
//! let ticket = TicketId::new("T-1");
//!
//! log.append(EventEnvelope::new(
//!     EventId::new("e-1"),
//!     Utc::now(),
//!     LedgerEvent::OrderConfirmed(OrderConfirmed { ticket_id: ticket.clone() }),
//! ));
//!
//! let state = project(&log.get_all(), &ticket);
//! assert_eq!(state.status, OrderStatus::Confirmed);
//! ```

mod board;
mod order;

pub use board::{kitchen_queue, project_all};
pub use order::{OrderProjection, OrderState, PaymentSession, PaymentStatus, SessionOutcome};

use crate::event::{LedgerEvent, RecordedEvent};
use crate::stream::TicketId;

/// A pure fold from events to the state of one entity.
pub trait Projection {
    /// Identifies the entity being projected.
    type Id;

    /// The derived view.
    type State;

    /// Projection name (logs, diagnostics).
    fn name(&self) -> &'static str;

    /// State of an entity no event has touched yet.
    fn initial(&self, id: &Self::Id) -> Self::State;

    /// Whether `event` belongs to the entity `id`. Events of other entities
    /// are filtered out before [`Projection::apply`] sees them.
    fn owns(&self, event: &LedgerEvent, id: &Self::Id) -> bool;

    /// Folds one owned event into `state`. Must be deterministic and must
    /// treat events it does not understand as no-ops.
    fn apply(&self, state: &mut Self::State, event: &RecordedEvent);

    /// Replays `events` (in log order) for entity `id`.
    fn project(&self, events: &[RecordedEvent], id: &Self::Id) -> Self::State {
        events
            .iter()
            .filter(|recorded| self.owns(&recorded.event, id))
            .fold(self.initial(id), |mut state, recorded| {
                self.apply(&mut state, recorded);
                state
            })
    }
}

/// Projects the order/payment state of one ticket.
///
/// `project(&[], id)` is the initial state: pending, no payment, zero totals.
#[must_use]
pub fn project(events: &[RecordedEvent], ticket_id: &TicketId) -> OrderState {
    OrderProjection.project(events, ticket_id)
}
