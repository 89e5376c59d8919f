//! Event schema and type guards.
//!
//! The ledger's domain events form a closed sum type, [`LedgerEvent`], with one
//! payload struct per variant. Guards come in two flavours:
//!
//! - `is_*` predicates (`is_payment_initiated(&event)`) answer "is this that
//!   kind of event"
//! - `as_*` accessors (`event.as_payment_initiated()`) narrow to the payload
//!
//! Both are total: every event satisfies at most one guard, and
//! [`LedgerEvent::Unknown`] (a `type` tag outside the taxonomy) satisfies none.
//!
//! # Serialized Form
//!
//! Events are internally tagged by `type`, whose value is the versioned name
//! returned by [`Event::event_type`]. A `PaymentInitiated` looks like:
//!
//! ```json
//! { "type": "PaymentInitiated.v1", "ticket_id": "T-1", "provider": "card",
//!   "amount": 2400, "session_id": "s-1" }
//! ```
//!
//! # Example
//!
//! ```
//! use mise_core::event::{LedgerEvent, PaymentSucceeded, is_payment_succeeded, is_payment_failed};
//! use mise_core::stream::{SessionId, TicketId};
//!
//! let event = LedgerEvent::PaymentSucceeded(PaymentSucceeded {
//!     ticket_id: TicketId::new("T-1"),
//!     session_id: SessionId::new("s-1"),
//! });
//!
//! assert!(is_payment_succeeded(&event));
//! assert!(!is_payment_failed(&event));
//! assert_eq!(event.as_payment_succeeded().map(|p| p.session_id.as_str()), Some("s-1"));
//! ```

use crate::stream::{CustomerId, EventId, Sequence, SessionId, TicketId};
use crate::types::{Money, PaymentProvider, Totals};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for event (de)serialization.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be appended to the log and replayed.
///
/// `event_type()` returns a stable, versioned name such as
/// `"PaymentInitiated.v1"`, used in logs and metrics labels.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;
}

/// The ticket was confirmed by the front of house.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    /// Owning ticket
    pub ticket_id: TicketId,
}

/// The kitchen started preparing the ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPreparing {
    /// Owning ticket
    pub ticket_id: TicketId,
}

/// The ticket is ready for pickup or service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReady {
    /// Owning ticket
    pub ticket_id: TicketId,
}

/// The ticket was handed over and closed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {
    /// Owning ticket
    pub ticket_id: TicketId,
}

/// The ticket was voided before preparation started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Free-text reason entered by staff
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A payment attempt was opened with a provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiated {
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Processor handling the attempt
    pub provider: PaymentProvider,
    /// Amount requested
    pub amount: Money,
    /// Fresh session for this attempt
    pub session_id: SessionId,
}

/// The provider captured the payment for a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSucceeded {
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Session being resolved
    pub session_id: SessionId,
}

/// The provider declined or aborted a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Session being resolved
    pub session_id: SessionId,
    /// Provider's decline reason
    pub reason: String,
}

/// Sale totals were recorded for a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecorded {
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Totals at the time of recording
    pub totals: Totals,
    /// Customer attached to the sale, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
}

/// Closed set of ledger events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// See [`OrderConfirmed`]
    #[serde(rename = "OrderConfirmed.v1")]
    OrderConfirmed(OrderConfirmed),
    /// See [`OrderPreparing`]
    #[serde(rename = "OrderPreparing.v1")]
    OrderPreparing(OrderPreparing),
    /// See [`OrderReady`]
    #[serde(rename = "OrderReady.v1")]
    OrderReady(OrderReady),
    /// See [`OrderCompleted`]
    #[serde(rename = "OrderCompleted.v1")]
    OrderCompleted(OrderCompleted),
    /// See [`OrderCancelled`]
    #[serde(rename = "OrderCancelled.v1")]
    OrderCancelled(OrderCancelled),
    /// See [`PaymentInitiated`]
    #[serde(rename = "PaymentInitiated.v1")]
    PaymentInitiated(PaymentInitiated),
    /// See [`PaymentSucceeded`]
    #[serde(rename = "PaymentSucceeded.v1")]
    PaymentSucceeded(PaymentSucceeded),
    /// See [`PaymentFailed`]
    #[serde(rename = "PaymentFailed.v1")]
    PaymentFailed(PaymentFailed),
    /// See [`SaleRecorded`]
    #[serde(rename = "SaleRecorded.v1")]
    SaleRecorded(SaleRecorded),
    /// A `type` tag this build does not know. Projections skip it.
    #[serde(other)]
    Unknown,
}

macro_rules! event_guards {
    ($($variant:ident => $is:ident, $as:ident;)*) => {
        impl LedgerEvent {
            $(
                #[doc = concat!("Narrows to the [`", stringify!($variant), "`] payload.")]
                #[must_use]
                pub const fn $as(&self) -> Option<&$variant> {
                    match self {
                        Self::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            )*
        }

        $(
            #[doc = concat!("Whether `event` is a `", stringify!($variant), "` event.")]
            #[must_use]
            pub const fn $is(event: &LedgerEvent) -> bool {
                matches!(event, LedgerEvent::$variant(_))
            }
        )*
    };
}

event_guards! {
    OrderConfirmed => is_order_confirmed, as_order_confirmed;
    OrderPreparing => is_order_preparing, as_order_preparing;
    OrderReady => is_order_ready, as_order_ready;
    OrderCompleted => is_order_completed, as_order_completed;
    OrderCancelled => is_order_cancelled, as_order_cancelled;
    PaymentInitiated => is_payment_initiated, as_payment_initiated;
    PaymentSucceeded => is_payment_succeeded, as_payment_succeeded;
    PaymentFailed => is_payment_failed, as_payment_failed;
    SaleRecorded => is_sale_recorded, as_sale_recorded;
}

impl LedgerEvent {
    /// The ticket this event belongs to (`None` for [`LedgerEvent::Unknown`]).
    #[must_use]
    pub const fn ticket_id(&self) -> Option<&TicketId> {
        match self {
            Self::OrderConfirmed(OrderConfirmed { ticket_id })
            | Self::OrderPreparing(OrderPreparing { ticket_id })
            | Self::OrderReady(OrderReady { ticket_id })
            | Self::OrderCompleted(OrderCompleted { ticket_id })
            | Self::OrderCancelled(OrderCancelled { ticket_id, .. })
            | Self::PaymentInitiated(PaymentInitiated { ticket_id, .. })
            | Self::PaymentSucceeded(PaymentSucceeded { ticket_id, .. })
            | Self::PaymentFailed(PaymentFailed { ticket_id, .. })
            | Self::SaleRecorded(SaleRecorded { ticket_id, .. }) => Some(ticket_id),
            Self::Unknown => None,
        }
    }

    /// Whether this event belongs to `ticket_id`.
    #[must_use]
    pub fn concerns(&self, ticket_id: &TicketId) -> bool {
        self.ticket_id() == Some(ticket_id)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if serialization fails.
    pub fn to_json(&self) -> Result<String, EventError> {
        serde_json::to_string(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize from JSON. Unrecognised `type` tags decode to
    /// [`LedgerEvent::Unknown`] rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the input is not a
    /// tagged object or a known variant's payload is malformed.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        serde_json::from_str(json).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::OrderConfirmed(_) => "OrderConfirmed.v1",
            Self::OrderPreparing(_) => "OrderPreparing.v1",
            Self::OrderReady(_) => "OrderReady.v1",
            Self::OrderCompleted(_) => "OrderCompleted.v1",
            Self::OrderCancelled(_) => "OrderCancelled.v1",
            Self::PaymentInitiated(_) => "PaymentInitiated.v1",
            Self::PaymentSucceeded(_) => "PaymentSucceeded.v1",
            Self::PaymentFailed(_) => "PaymentFailed.v1",
            Self::SaleRecorded(_) => "SaleRecorded.v1",
            Self::Unknown => "Unknown",
        }
    }
}

/// An event ready to be appended: identity and timestamp are assigned by
/// the command layer, the sequence by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event id
    pub id: EventId,
    /// Wall-clock time the command produced the event (informational)
    pub at: DateTime<Utc>,
    /// The event itself
    pub event: LedgerEvent,
}

impl EventEnvelope {
    /// Wraps an event for appending.
    #[must_use]
    pub const fn new(id: EventId, at: DateTime<Utc>, event: LedgerEvent) -> Self {
        Self { id, at, event }
    }
}

/// An event as stored in the log. Never mutated after append.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Unique event id
    pub id: EventId,
    /// Position in the log, assigned by the store
    pub seq: Sequence,
    /// Wall-clock time the event was produced
    pub at: DateTime<Utc>,
    /// The event itself
    pub event: LedgerEvent,
}

impl RecordedEvent {
    /// Stamps an envelope with its sequence number.
    #[must_use]
    pub fn from_envelope(envelope: EventEnvelope, seq: Sequence) -> Self {
        let EventEnvelope { id, at, event } = envelope;
        Self { id, seq, at, event }
    }

    /// The ticket this event belongs to.
    #[must_use]
    pub const fn ticket_id(&self) -> Option<&TicketId> {
        self.event.ticket_id()
    }
}
