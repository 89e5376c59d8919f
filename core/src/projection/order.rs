use super::Projection;
use crate::event::{
    LedgerEvent, PaymentFailed, PaymentInitiated, PaymentSucceeded, RecordedEvent, SaleRecorded,
};
use crate::lifecycle::{OrderAction, OrderStatus};
use crate::stream::{CustomerId, Sequence, SessionId, TicketId};
use crate::types::{Money, PaymentProvider, Totals};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment badge shown on a ticket.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No payment attempted
    #[default]
    None,
    /// A session is waiting on the provider
    Pending,
    /// The active session succeeded
    Paid,
    /// The active session failed
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How a payment session ended (or that it has not yet).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Waiting on the provider
    Pending,
    /// Captured
    Succeeded,
    /// Declined or aborted
    Failed {
        /// Provider's reason
        reason: String,
    },
}

/// The payment attempt currently considered authoritative for a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Session identifier
    pub session_id: SessionId,
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Processor
    pub provider: PaymentProvider,
    /// Amount requested
    pub amount: Money,
    /// Resolution so far
    pub outcome: SessionOutcome,
}

/// Current state of one ticket, derived by replaying its events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    /// The ticket
    pub ticket_id: TicketId,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Totals from the latest recorded sale
    pub totals: Totals,
    /// Customer from the latest recorded sale
    pub customer_id: Option<CustomerId>,
    /// Most recently initiated payment session
    pub active_session: Option<PaymentSession>,
    /// Sequence of the last event that changed this state
    pub last_event_seq: Option<Sequence>,
}

impl OrderState {
    /// The state of a ticket with no events.
    #[must_use]
    pub fn new(ticket_id: TicketId) -> Self {
        Self {
            ticket_id,
            status: OrderStatus::Pending,
            totals: Totals::default(),
            customer_id: None,
            active_session: None,
            last_event_seq: None,
        }
    }

    /// Payment status, derived from the active session's outcome.
    #[must_use]
    pub const fn payment_status(&self) -> PaymentStatus {
        match &self.active_session {
            None => PaymentStatus::None,
            Some(session) => match session.outcome {
                SessionOutcome::Pending => PaymentStatus::Pending,
                SessionOutcome::Succeeded => PaymentStatus::Paid,
                SessionOutcome::Failed { .. } => PaymentStatus::Failed,
            },
        }
    }

    /// Whether any event has touched this ticket.
    #[must_use]
    pub const fn is_untouched(&self) -> bool {
        self.last_event_seq.is_none()
    }

    fn advance(&mut self, action: OrderAction, seq: Sequence) -> bool {
        if let Some(next) = self.status.next(action) {
            self.status = next;
            true
        } else {
            tracing::warn!(
                ticket_id = %self.ticket_id,
                %seq,
                status = %self.status,
                ?action,
                "skipping illegal order transition in log"
            );
            false
        }
    }

    fn open_session(&mut self, initiated: &PaymentInitiated) -> bool {
        if let Some(current) = &self.active_session {
            if current.session_id == initiated.session_id {
                return false;
            }
            if current.outcome == SessionOutcome::Pending {
                tracing::debug!(
                    ticket_id = %self.ticket_id,
                    superseded = %current.session_id,
                    session_id = %initiated.session_id,
                    "pending payment session superseded"
                );
            }
        }
        self.active_session = Some(PaymentSession {
            session_id: initiated.session_id.clone(),
            ticket_id: initiated.ticket_id.clone(),
            provider: initiated.provider.clone(),
            amount: initiated.amount,
            outcome: SessionOutcome::Pending,
        });
        true
    }

    fn resolve(&mut self, session_id: &SessionId, outcome: SessionOutcome) -> bool {
        let Some(session) = self
            .active_session
            .as_mut()
            .filter(|session| &session.session_id == session_id)
        else {
            tracing::debug!(
                ticket_id = %self.ticket_id,
                %session_id,
                "ignoring resolution for stale payment session"
            );
            return false;
        };

        if session.outcome == SessionOutcome::Pending {
            session.outcome = outcome;
            return true;
        }
        if session.outcome != outcome {
            tracing::warn!(
                ticket_id = %self.ticket_id,
                %session_id,
                current = ?session.outcome,
                ?outcome,
                "ignoring conflicting resolution for already resolved session"
            );
        }
        false
    }

    fn record_sale(&mut self, sale: &SaleRecorded) -> bool {
        if self.totals == sale.totals && self.customer_id == sale.customer_id {
            return false;
        }
        self.totals = sale.totals;
        self.customer_id.clone_from(&sale.customer_id);
        true
    }
}

/// Folds ticket events into [`OrderState`].
#[derive(Copy, Clone, Debug, Default)]
pub struct OrderProjection;

impl Projection for OrderProjection {
    type Id = TicketId;
    type State = OrderState;

    fn name(&self) -> &'static str {
        "order_state"
    }

    fn initial(&self, id: &TicketId) -> OrderState {
        OrderState::new(id.clone())
    }

    fn owns(&self, event: &LedgerEvent, id: &TicketId) -> bool {
        event.concerns(id)
    }

    fn apply(&self, state: &mut OrderState, recorded: &RecordedEvent) {
        let seq = recorded.seq;
        let changed = match &recorded.event {
            LedgerEvent::OrderConfirmed(_) => state.advance(OrderAction::Confirm, seq),
            LedgerEvent::OrderPreparing(_) => state.advance(OrderAction::Prepare, seq),
            LedgerEvent::OrderReady(_) => state.advance(OrderAction::MarkReady, seq),
            LedgerEvent::OrderCompleted(_) => state.advance(OrderAction::Complete, seq),
            LedgerEvent::OrderCancelled(_) => state.advance(OrderAction::Cancel, seq),
            LedgerEvent::PaymentInitiated(initiated) => state.open_session(initiated),
            LedgerEvent::PaymentSucceeded(PaymentSucceeded { session_id, .. }) => {
                state.resolve(session_id, SessionOutcome::Succeeded)
            },
            LedgerEvent::PaymentFailed(PaymentFailed {
                session_id, reason, ..
            }) => state.resolve(
                session_id,
                SessionOutcome::Failed {
                    reason: reason.clone(),
                },
            ),
            LedgerEvent::SaleRecorded(sale) => state.record_sale(sale),
            LedgerEvent::Unknown => false,
        };

        if changed {
            state.last_event_seq = Some(seq);
        }
    }
}
