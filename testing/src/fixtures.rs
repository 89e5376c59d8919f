//! Event builders for tests.
//!
//! Ids are plain `&str`s and amounts are cents, so scenarios read like the
//! ticket they describe.

use chrono::{DateTime, Utc};
use mise_core::event::{
    LedgerEvent, OrderCancelled, OrderCompleted, OrderConfirmed, OrderPreparing, OrderReady,
    PaymentFailed, PaymentInitiated, PaymentSucceeded, RecordedEvent, SaleRecorded,
};
use mise_core::stream::{CustomerId, EventId, SessionId, Sequence, TicketId};
use mise_core::types::{Money, PaymentProvider, Totals};

/// `OrderConfirmed` for `ticket`.
#[must_use]
pub fn confirmed(ticket: &str) -> LedgerEvent {
    LedgerEvent::OrderConfirmed(OrderConfirmed {
        ticket_id: TicketId::new(ticket),
    })
}

/// `OrderPreparing` for `ticket`.
#[must_use]
pub fn preparing(ticket: &str) -> LedgerEvent {
    LedgerEvent::OrderPreparing(OrderPreparing {
        ticket_id: TicketId::new(ticket),
    })
}

/// `OrderReady` for `ticket`.
#[must_use]
pub fn ready(ticket: &str) -> LedgerEvent {
    LedgerEvent::OrderReady(OrderReady {
        ticket_id: TicketId::new(ticket),
    })
}

/// `OrderCompleted` for `ticket`.
#[must_use]
pub fn completed(ticket: &str) -> LedgerEvent {
    LedgerEvent::OrderCompleted(OrderCompleted {
        ticket_id: TicketId::new(ticket),
    })
}

/// `OrderCancelled` for `ticket`.
#[must_use]
pub fn cancelled(ticket: &str, reason: Option<&str>) -> LedgerEvent {
    LedgerEvent::OrderCancelled(OrderCancelled {
        ticket_id: TicketId::new(ticket),
        reason: reason.map(str::to_string),
    })
}

/// Card `PaymentInitiated` for `ticket`.
#[must_use]
pub fn initiated(ticket: &str, session: &str, cents: i64) -> LedgerEvent {
    LedgerEvent::PaymentInitiated(PaymentInitiated {
        ticket_id: TicketId::new(ticket),
        provider: PaymentProvider::Card,
        amount: Money::from_cents(cents),
        session_id: SessionId::new(session),
    })
}

/// `PaymentSucceeded` for `session` on `ticket`.
#[must_use]
pub fn succeeded(ticket: &str, session: &str) -> LedgerEvent {
    LedgerEvent::PaymentSucceeded(PaymentSucceeded {
        ticket_id: TicketId::new(ticket),
        session_id: SessionId::new(session),
    })
}

/// `PaymentFailed` for `session` on `ticket`.
#[must_use]
pub fn failed(ticket: &str, session: &str, reason: &str) -> LedgerEvent {
    LedgerEvent::PaymentFailed(PaymentFailed {
        ticket_id: TicketId::new(ticket),
        session_id: SessionId::new(session),
        reason: reason.to_string(),
    })
}

/// `SaleRecorded` with no tax or tip.
#[must_use]
pub fn sale(ticket: &str, subtotal_cents: i64, customer: Option<&str>) -> LedgerEvent {
    LedgerEvent::SaleRecorded(SaleRecorded {
        ticket_id: TicketId::new(ticket),
        totals: Totals::new(Money::from_cents(subtotal_cents), Money::ZERO, Money::ZERO),
        customer_id: customer.map(CustomerId::new),
    })
}

/// Numbers `events` as a log would, starting at sequence 1.
#[must_use]
pub fn recorded(events: impl IntoIterator<Item = LedgerEvent>) -> Vec<RecordedEvent> {
    let mut seq = Sequence::FIRST;
    events
        .into_iter()
        .map(|event| {
            let recorded = RecordedEvent {
                id: EventId::new(format!("evt-{}", seq.value())),
                seq,
                at: DateTime::<Utc>::UNIX_EPOCH,
                event,
            };
            seq = seq.next();
            recorded
        })
        .collect()
}
