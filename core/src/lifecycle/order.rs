//! Ticket status machine and order/payment guards.
//!
//! ```text
//! pending -(confirm)-> confirmed -(prepare)-> preparing -(mark ready)-> ready -(complete)-> completed
//! any of {pending, confirmed} -(cancel)-> cancelled
//! ```
//!
//! [`OrderStatus::next`] is the transition table. The projection fold uses it
//! to skip illegal transitions that reached the log; the guards below use it
//! (plus payment state) to decide which commands are accepted.

use super::IllegalTransition;
use crate::projection::{OrderState, PaymentStatus};
use crate::stream::SessionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a ticket is in its lifecycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Rung in, not yet confirmed
    #[default]
    Pending,
    /// Accepted by the front of house
    Confirmed,
    /// On the line
    Preparing,
    /// Waiting at the pass
    Ready,
    /// Handed over (terminal)
    Completed,
    /// Voided (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Status reached by `action`, or `None` if the edge does not exist.
    ///
    /// ```
    /// use mise_core::lifecycle::{OrderAction, OrderStatus};
    ///
    /// assert_eq!(OrderStatus::Pending.next(OrderAction::Confirm), Some(OrderStatus::Confirmed));
    /// assert_eq!(OrderStatus::Ready.next(OrderAction::Cancel), None);
    /// ```
    #[must_use]
    pub const fn next(self, action: OrderAction) -> Option<Self> {
        match (self, action) {
            (Self::Pending, OrderAction::Confirm) => Some(Self::Confirmed),
            (Self::Confirmed, OrderAction::Prepare) => Some(Self::Preparing),
            (Self::Preparing, OrderAction::MarkReady) => Some(Self::Ready),
            (Self::Ready, OrderAction::Complete) => Some(Self::Completed),
            (Self::Pending | Self::Confirmed, OrderAction::Cancel) => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled tickets accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Edges of the ticket status machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrderAction {
    /// pending → confirmed
    Confirm,
    /// confirmed → preparing
    Prepare,
    /// preparing → ready
    MarkReady,
    /// ready → completed
    Complete,
    /// pending | confirmed → cancelled
    Cancel,
}

/// Commands the console can issue against a ticket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrderCommand {
    /// Confirm the ticket
    Confirm,
    /// Send it to the line
    StartPreparing,
    /// Put it at the pass
    MarkReady,
    /// Close it out
    Complete,
    /// Void it
    Cancel,
    /// Record (or re-record) sale totals
    RecordSale,
    /// Open a payment session
    TakePayment,
    /// Supersede a pending payment session with a new one
    RestartPayment,
}

impl OrderCommand {
    /// Every command, in menu order.
    pub const ALL: [Self; 8] = [
        Self::Confirm,
        Self::StartPreparing,
        Self::MarkReady,
        Self::Complete,
        Self::Cancel,
        Self::RecordSale,
        Self::TakePayment,
        Self::RestartPayment,
    ];

    /// Stable snake-case name (logs, metrics labels).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::StartPreparing => "start_preparing",
            Self::MarkReady => "mark_ready",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::RecordSale => "record_sale",
            Self::TakePayment => "take_payment",
            Self::RestartPayment => "restart_payment",
        }
    }
}

impl fmt::Display for OrderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const fn has_edge(state: &OrderState, action: OrderAction) -> bool {
    state.status.next(action).is_some()
}

/// Whether the ticket can be confirmed.
#[must_use]
pub fn can_confirm(state: &OrderState) -> bool {
    has_edge(state, OrderAction::Confirm)
}

/// Whether the ticket can go to the line.
#[must_use]
pub fn can_prepare(state: &OrderState) -> bool {
    has_edge(state, OrderAction::Prepare)
}

/// Whether the ticket can be put at the pass.
#[must_use]
pub fn can_mark_ready(state: &OrderState) -> bool {
    has_edge(state, OrderAction::MarkReady)
}

/// Whether the ticket can be closed: it must be ready and paid.
#[must_use]
pub fn can_complete(state: &OrderState) -> bool {
    has_edge(state, OrderAction::Complete) && state.payment_status() == PaymentStatus::Paid
}

/// Whether the ticket can be voided: not yet on the line, and no money
/// captured or in flight.
#[must_use]
pub fn can_cancel(state: &OrderState) -> bool {
    has_edge(state, OrderAction::Cancel)
        && matches!(state.payment_status(), PaymentStatus::None | PaymentStatus::Failed)
}

/// Whether sale totals can be (re-)recorded.
#[must_use]
pub fn can_record_sale(state: &OrderState) -> bool {
    !state.status.is_terminal()
        && matches!(state.payment_status(), PaymentStatus::None | PaymentStatus::Failed)
}

/// Whether a new payment session can be opened.
///
/// False while a session is pending, which is what turns a double-clicked
/// "Take Payment" into a single session.
#[must_use]
pub fn can_take_payment(state: &OrderState) -> bool {
    !state.status.is_terminal()
        && matches!(state.payment_status(), PaymentStatus::None | PaymentStatus::Failed)
}

/// Whether the pending session can be superseded by a new one.
#[must_use]
pub fn can_restart_payment(state: &OrderState) -> bool {
    !state.status.is_terminal() && state.payment_status() == PaymentStatus::Pending
}

/// Whether `session_id` is the session a resolution would currently apply to.
#[must_use]
pub fn is_active_session(state: &OrderState, session_id: &SessionId) -> bool {
    state
        .active_session
        .as_ref()
        .is_some_and(|session| &session.session_id == session_id)
}

/// Dispatches to the guard for `command`.
#[must_use]
pub fn permits(state: &OrderState, command: OrderCommand) -> bool {
    match command {
        OrderCommand::Confirm => can_confirm(state),
        OrderCommand::StartPreparing => can_prepare(state),
        OrderCommand::MarkReady => can_mark_ready(state),
        OrderCommand::Complete => can_complete(state),
        OrderCommand::Cancel => can_cancel(state),
        OrderCommand::RecordSale => can_record_sale(state),
        OrderCommand::TakePayment => can_take_payment(state),
        OrderCommand::RestartPayment => can_restart_payment(state),
    }
}

/// Commands to render for the ticket right now.
#[must_use]
pub fn available_commands(state: &OrderState) -> Vec<OrderCommand> {
    OrderCommand::ALL
        .into_iter()
        .filter(|command| permits(state, *command))
        .collect()
}

/// Enforces the guard for `command`.
///
/// # Errors
///
/// Returns [`IllegalTransition`] if the guard forbids the command.
pub fn ensure(state: &OrderState, command: OrderCommand) -> Result<(), IllegalTransition> {
    if permits(state, command) {
        Ok(())
    } else {
        let status = format!("{} (payment {})", state.status, state.payment_status());
        Err(IllegalTransition::new("order", command, status))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::projection::{PaymentSession, SessionOutcome};
    use crate::stream::TicketId;
    use crate::types::{Money, PaymentProvider};

    fn state(status: OrderStatus) -> OrderState {
        let mut state = OrderState::new(TicketId::new("T-1"));
        state.status = status;
        state
    }

    fn with_payment(mut state: OrderState, outcome: SessionOutcome) -> OrderState {
        state.active_session = Some(PaymentSession {
            session_id: SessionId::new("s-1"),
            ticket_id: state.ticket_id.clone(),
            provider: PaymentProvider::Card,
            amount: Money::from_cents(900),
            outcome,
        });
        state
    }

    #[test]
    fn transition_table_is_linear_with_early_cancel() {
        use OrderAction::{Cancel, Complete, Confirm, MarkReady, Prepare};
        use OrderStatus::{Cancelled, Completed, Confirmed, Pending, Preparing, Ready};

        assert_eq!(Pending.next(Confirm), Some(Confirmed));
        assert_eq!(Confirmed.next(Prepare), Some(Preparing));
        assert_eq!(Preparing.next(MarkReady), Some(Ready));
        assert_eq!(Ready.next(Complete), Some(Completed));
        assert_eq!(Pending.next(Cancel), Some(Cancelled));
        assert_eq!(Confirmed.next(Cancel), Some(Cancelled));
        for terminal in [Completed, Cancelled] {
            for action in [Confirm, Prepare, MarkReady, Complete, Cancel] {
                assert_eq!(terminal.next(action), None);
            }
        }
        assert_eq!(Pending.next(Prepare), None);
    }

    #[test]
    fn ready_ticket_rejects_cancel() {
        let ready = state(OrderStatus::Ready);
        assert!(!can_cancel(&ready));
        let err = ensure(&ready, OrderCommand::Cancel).unwrap_err();
        assert_eq!(err.to_string(), "cannot cancel order in status ready (payment none)");
    }

    #[test]
    fn complete_requires_payment() {
        let ready = state(OrderStatus::Ready);
        assert!(!can_complete(&ready));
        assert!(!can_complete(&with_payment(ready.clone(), SessionOutcome::Pending)));
        assert!(can_complete(&with_payment(ready, SessionOutcome::Succeeded)));
    }

    #[test]
    fn pending_session_blocks_second_payment() {
        let open = with_payment(state(OrderStatus::Confirmed), SessionOutcome::Pending);
        assert!(!can_take_payment(&open));
        assert!(can_restart_payment(&open));
        assert!(!can_cancel(&open));
        assert!(!can_record_sale(&open));
    }

    #[test]
    fn failed_session_allows_retry() {
        let failed = with_payment(
            state(OrderStatus::Pending),
            SessionOutcome::Failed {
                reason: "declined".into(),
            },
        );
        assert!(can_take_payment(&failed));
        assert!(!can_restart_payment(&failed));
        assert!(can_cancel(&failed));
    }

    #[test]
    fn paid_ticket_cannot_pay_again() {
        let paid = with_payment(state(OrderStatus::Preparing), SessionOutcome::Succeeded);
        assert!(!can_take_payment(&paid));
        assert!(!can_restart_payment(&paid));
    }

    #[test]
    fn terminal_tickets_offer_nothing() {
        for status in [OrderStatus::Completed, OrderStatus::Cancelled] {
            assert!(available_commands(&state(status)).is_empty());
        }
    }

    #[test]
    fn fresh_ticket_menu() {
        assert_eq!(
            available_commands(&state(OrderStatus::Pending)),
            vec![
                OrderCommand::Confirm,
                OrderCommand::Cancel,
                OrderCommand::RecordSale,
                OrderCommand::TakePayment,
            ]
        );
    }

    #[test]
    fn active_session_matches_by_id() {
        let open = with_payment(state(OrderStatus::Pending), SessionOutcome::Pending);
        assert!(is_active_session(&open, &SessionId::new("s-1")));
        assert!(!is_active_session(&open, &SessionId::new("s-0")));
        assert!(!is_active_session(&state(OrderStatus::Pending), &SessionId::new("s-1")));
    }
}
