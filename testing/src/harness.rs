//! Given/then harness over a real event log.
#![allow(clippy::panic)] // Assertion helpers panic by design

use crate::test_ledger;
use mise_core::event::LedgerEvent;
use mise_core::lifecycle::order::{available_commands, permits};
use mise_core::lifecycle::{OrderCommand, OrderStatus};
use mise_core::projection::{OrderState, PaymentStatus, project};
use mise_core::stream::TicketId;
use mise_runtime::Ledger;

/// Test harness for scenarios expressed as events.
///
/// Events given to the harness are appended to a fresh log through a
/// [`Ledger`] with a fixed clock and sequential ids; assertions project the
/// log exactly as the console would.
///
/// # Example
///
/// ```
/// use mise_testing::{LedgerTestHarness, fixtures};
/// use mise_core::lifecycle::OrderStatus;
///
/// LedgerTestHarness::new()
///     .given(vec![fixtures::confirmed("T-9"), fixtures::preparing("T-9")])
///     .then_status("T-9", OrderStatus::Preparing);
/// ```
pub struct LedgerTestHarness {
    ledger: Ledger,
}

impl Default for LedgerTestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerTestHarness {
    /// A harness over an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledger: test_ledger(),
        }
    }

    /// Appends `events` in order, unguarded.
    pub fn given(&mut self, events: Vec<LedgerEvent>) -> &mut Self {
        for event in events {
            self.given_event(event);
        }
        self
    }

    /// Appends one event, unguarded.
    pub fn given_event(&mut self, event: LedgerEvent) -> &mut Self {
        self.ledger.log.append(self.ledger.envelope(event));
        self
    }

    /// Current projected state of `ticket`.
    #[must_use]
    pub fn state(&self, ticket: &str) -> OrderState {
        project(&self.ledger.log.get_all(), &TicketId::new(ticket))
    }

    /// The ledger, for building command handlers over the same log.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Assert the ticket's status.
    ///
    /// # Panics
    ///
    /// Panics if the status differs (this is a test assertion).
    pub fn then_status(&self, ticket: &str, expected: OrderStatus) -> &Self {
        let actual = self.state(ticket).status;
        assert_eq!(
            actual, expected,
            "Expected ticket '{ticket}' to be {expected}, but it is {actual}"
        );
        self
    }

    /// Assert the ticket's payment status.
    ///
    /// # Panics
    ///
    /// Panics if the payment status differs (this is a test assertion).
    pub fn then_payment(&self, ticket: &str, expected: PaymentStatus) -> &Self {
        let actual = self.state(ticket).payment_status();
        assert_eq!(
            actual, expected,
            "Expected payment of ticket '{ticket}' to be {expected}, but it is {actual}"
        );
        self
    }

    /// Assert that the guard for `command` passes.
    ///
    /// # Panics
    ///
    /// Panics if the guard forbids the command (this is a test assertion).
    pub fn then_allows(&self, ticket: &str, command: OrderCommand) -> &Self {
        let state = self.state(ticket);
        assert!(
            permits(&state, command),
            "Expected '{command}' to be allowed on ticket '{ticket}', available: {:?}",
            available_commands(&state)
        );
        self
    }

    /// Assert that the guard for `command` refuses.
    ///
    /// # Panics
    ///
    /// Panics if the guard allows the command (this is a test assertion).
    pub fn then_forbids(&self, ticket: &str, command: OrderCommand) -> &Self {
        let state = self.state(ticket);
        assert!(
            !permits(&state, command),
            "Expected '{command}' to be forbidden on ticket '{ticket}', available: {:?}",
            available_commands(&state)
        );
        self
    }

    /// Assert the number of events in the log.
    ///
    /// # Panics
    ///
    /// Panics if the count differs (this is a test assertion).
    pub fn then_event_count(&self, expected: usize) -> &Self {
        let actual = self.ledger.log.len();
        assert_eq!(actual, expected, "Expected {expected} events in the log, found {actual}");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn kitchen_flow_through_harness() {
        LedgerTestHarness::new()
            .given(vec![
                fixtures::confirmed("T-1"),
                fixtures::preparing("T-1"),
                fixtures::ready("T-1"),
            ])
            .then_status("T-1", OrderStatus::Ready)
            .then_forbids("T-1", OrderCommand::Cancel)
            .then_forbids("T-1", OrderCommand::Complete)
            .then_allows("T-1", OrderCommand::TakePayment)
            .then_event_count(3);
    }

    #[test]
    #[should_panic(expected = "Expected ticket 'T-1' to be confirmed")]
    fn failed_assertion_names_the_ticket() {
        LedgerTestHarness::new().then_status("T-1", OrderStatus::Confirmed);
    }
}
