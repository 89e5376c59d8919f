//! Order and payment commands.
//!
//! Every guarded command follows the same path:
//!
//! 1. Project the ticket and consult its guard. A refusal returns
//!    [`CommandError::IllegalTransition`] and touches nothing upstream.
//! 2. Issue the upstream call, bounded by the configured timeout. The call is
//!    only made once the guard passes.
//! 3. Re-project and re-check the guard under the log's write lock
//!    ([`EventLog::append_if`](mise_core::event_store::EventLog::append_if))
//!    and append. Another command may have landed while this one awaited; in
//!    that case nothing is appended and the caller gets
//!    [`CommandError::IllegalTransition`].
//!
//! Step 3 is what turns a double-clicked "Take Payment" into exactly one
//! `PaymentInitiated` event. Opening a payment session additionally claims
//! the ticket for the duration of the gateway call, so concurrent clicks
//! never reach the gateway more than once.

use crate::backend::{OrderBackend, PaymentGateway, PaymentRequest};
use crate::config::LedgerConfig;
use crate::environment::Ledger;
use crate::error::{CommandError, UpstreamError};
use crate::metrics::{self, OUTCOME_OK};
use mise_core::event::{
    Event, LedgerEvent, OrderCancelled, OrderCompleted, OrderConfirmed, OrderPreparing, OrderReady,
    PaymentFailed, PaymentInitiated, PaymentSucceeded, RecordedEvent, SaleRecorded,
};
use mise_core::lifecycle::order;
use mise_core::lifecycle::{IllegalTransition, OrderCommand};
use mise_core::projection::{OrderState, project};
use mise_core::stream::{CustomerId, SessionId, TicketId};
use mise_core::types::{Money, PaymentProvider, Totals};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// The provider's verdict on a payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentVerdict {
    /// Money captured
    Succeeded,
    /// Declined or errored
    Failed {
        /// Provider-supplied reason
        reason: String,
    },
}

/// Awaits `upstream` for at most `timeout`.
pub(crate) async fn call_upstream<F>(
    timeout: Duration,
    operation: &str,
    upstream: F,
) -> Result<(), CommandError>
where
    F: Future<Output = Result<(), UpstreamError>>,
{
    match tokio::time::timeout(timeout, upstream).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            tracing::warn!(operation, error = %err, "Upstream call failed");
            Err(err.into())
        }
        Err(_) => {
            tracing::warn!(operation, ?timeout, "Upstream call timed out");
            Err(CommandError::Timeout(timeout))
        }
    }
}

/// Tickets with a payment session being opened right now.
#[derive(Debug, Default)]
struct OpeningSessions(Mutex<HashSet<TicketId>>);

impl OpeningSessions {
    fn claim(&self, ticket_id: &TicketId) -> Option<SessionClaim<'_>> {
        let mut opening = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        opening.insert(ticket_id.clone()).then(|| SessionClaim {
            sessions: self,
            ticket_id: ticket_id.clone(),
        })
    }
}

/// Releases the ticket when dropped, whatever the command's outcome.
struct SessionClaim<'a> {
    sessions: &'a OpeningSessions,
    ticket_id: TicketId,
}

impl Drop for SessionClaim<'_> {
    fn drop(&mut self) {
        self.sessions
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.ticket_id);
    }
}

/// Command handlers for tickets.
///
/// # Example
///
/// ```ignore
/// let commands = OrderCommands::new(Ledger::system(), api_client, gateway, &config);
///
/// commands.confirm(&ticket).await?;
/// let session = commands
///     .take_payment(&ticket, PaymentProvider::Card, Money::from_cents(2_450))
///     .await?;
///
/// // later, when the gateway calls back
/// commands.resolve_payment(&ticket, session.session_id, PaymentVerdict::Succeeded);
/// ```
pub struct OrderCommands<B, G> {
    ledger: Ledger,
    backend: B,
    gateway: G,
    timeout: Duration,
    opening: OpeningSessions,
}

impl<B, G> OrderCommands<B, G>
where
    B: OrderBackend,
    G: PaymentGateway,
{
    /// Creates the handlers over `ledger`.
    #[must_use]
    pub fn new(ledger: Ledger, backend: B, gateway: G, config: &LedgerConfig) -> Self {
        Self {
            ledger,
            backend,
            gateway,
            timeout: config.upstream_timeout(),
            opening: OpeningSessions::default(),
        }
    }

    /// The ledger environment.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The order API client.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The payment gateway client.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Current projected state of a ticket.
    #[must_use]
    pub fn state(&self, ticket_id: &TicketId) -> OrderState {
        project(&self.ledger.log.get_all(), ticket_id)
    }

    /// Commands the console should offer for a ticket right now.
    #[must_use]
    pub fn available(&self, ticket_id: &TicketId) -> Vec<OrderCommand> {
        order::available_commands(&self.state(ticket_id))
    }

    /// Confirms a pending ticket.
    ///
    /// # Errors
    ///
    /// See the module docs.
    pub async fn confirm(&self, ticket_id: &TicketId) -> Result<RecordedEvent, CommandError> {
        let event = LedgerEvent::OrderConfirmed(OrderConfirmed {
            ticket_id: ticket_id.clone(),
        });
        self.transition(ticket_id, OrderCommand::Confirm, event).await
    }

    /// Sends a confirmed ticket to the line.
    ///
    /// # Errors
    ///
    /// See the module docs.
    pub async fn start_preparing(&self, ticket_id: &TicketId) -> Result<RecordedEvent, CommandError> {
        let event = LedgerEvent::OrderPreparing(OrderPreparing {
            ticket_id: ticket_id.clone(),
        });
        self.transition(ticket_id, OrderCommand::StartPreparing, event)
            .await
    }

    /// Puts a ticket at the pass.
    ///
    /// # Errors
    ///
    /// See the module docs.
    pub async fn mark_ready(&self, ticket_id: &TicketId) -> Result<RecordedEvent, CommandError> {
        let event = LedgerEvent::OrderReady(OrderReady {
            ticket_id: ticket_id.clone(),
        });
        self.transition(ticket_id, OrderCommand::MarkReady, event).await
    }

    /// Closes out a ready, paid ticket.
    ///
    /// # Errors
    ///
    /// See the module docs.
    pub async fn complete(&self, ticket_id: &TicketId) -> Result<RecordedEvent, CommandError> {
        let event = LedgerEvent::OrderCompleted(OrderCompleted {
            ticket_id: ticket_id.clone(),
        });
        self.transition(ticket_id, OrderCommand::Complete, event).await
    }

    /// Voids a ticket that has not reached the line.
    ///
    /// # Errors
    ///
    /// See the module docs.
    pub async fn cancel(
        &self,
        ticket_id: &TicketId,
        reason: Option<String>,
    ) -> Result<RecordedEvent, CommandError> {
        let event = LedgerEvent::OrderCancelled(OrderCancelled {
            ticket_id: ticket_id.clone(),
            reason,
        });
        self.transition(ticket_id, OrderCommand::Cancel, event).await
    }

    /// Records (or re-records) sale totals.
    ///
    /// # Errors
    ///
    /// See the module docs.
    pub async fn record_sale(
        &self,
        ticket_id: &TicketId,
        totals: Totals,
        customer_id: Option<CustomerId>,
    ) -> Result<RecordedEvent, CommandError> {
        let event = LedgerEvent::SaleRecorded(SaleRecorded {
            ticket_id: ticket_id.clone(),
            totals,
            customer_id: customer_id.clone(),
        });
        self.guarded(ticket_id, OrderCommand::RecordSale, event, || {
            self.backend
                .record_sale(ticket_id, &totals, customer_id.as_ref())
        })
        .await
    }

    /// Opens a payment session. Refused while another session is pending or
    /// after the ticket is paid.
    ///
    /// Returns the request sent to the gateway; its `session_id` is what the
    /// eventual [`OrderCommands::resolve_payment`] must name.
    ///
    /// # Errors
    ///
    /// See the module docs.
    pub async fn take_payment(
        &self,
        ticket_id: &TicketId,
        provider: PaymentProvider,
        amount: Money,
    ) -> Result<PaymentRequest, CommandError> {
        self.open_session(ticket_id, OrderCommand::TakePayment, provider, amount)
            .await
    }

    /// Supersedes the pending session with a new one. A late verdict for the
    /// old session is still recorded but no longer affects the ticket.
    ///
    /// # Errors
    ///
    /// See the module docs.
    pub async fn restart_payment(
        &self,
        ticket_id: &TicketId,
        provider: PaymentProvider,
        amount: Money,
    ) -> Result<PaymentRequest, CommandError> {
        self.open_session(ticket_id, OrderCommand::RestartPayment, provider, amount)
            .await
    }

    /// Records the provider's verdict on `session_id`.
    ///
    /// The verdict is a fact and is always appended. If the session is no
    /// longer the ticket's active one the projection ignores it.
    pub fn resolve_payment(
        &self,
        ticket_id: &TicketId,
        session_id: SessionId,
        verdict: PaymentVerdict,
    ) -> RecordedEvent {
        if !order::is_active_session(&self.state(ticket_id), &session_id) {
            tracing::debug!(
                ticket_id = %ticket_id,
                session_id = %session_id,
                "Verdict for an inactive payment session, recording without effect"
            );
        }
        let event = match verdict {
            PaymentVerdict::Succeeded => LedgerEvent::PaymentSucceeded(PaymentSucceeded {
                ticket_id: ticket_id.clone(),
                session_id,
            }),
            PaymentVerdict::Failed { reason } => LedgerEvent::PaymentFailed(PaymentFailed {
                ticket_id: ticket_id.clone(),
                session_id,
                reason,
            }),
        };
        let recorded = self.ledger.log.append(self.ledger.envelope(event));
        metrics::record_append(recorded.event.event_type());
        metrics::record_command("resolve_payment", OUTCOME_OK);
        recorded
    }

    async fn open_session(
        &self,
        ticket_id: &TicketId,
        command: OrderCommand,
        provider: PaymentProvider,
        amount: Money,
    ) -> Result<PaymentRequest, CommandError> {
        let Some(_claim) = self.opening.claim(ticket_id) else {
            let state = self.state(ticket_id);
            let err = IllegalTransition::new("order", command, format!("{} (payment opening)", state.status));
            tracing::warn!(ticket_id = %ticket_id, command = %command, error = %err, "Payment session already being opened");
            let err = CommandError::from(err);
            metrics::record_command(command.name(), err.outcome());
            return Err(err);
        };

        let request = PaymentRequest {
            ticket_id: ticket_id.clone(),
            session_id: self.ledger.ids.session_id(),
            provider,
            amount,
        };
        let event = LedgerEvent::PaymentInitiated(PaymentInitiated {
            ticket_id: ticket_id.clone(),
            provider: request.provider.clone(),
            amount,
            session_id: request.session_id.clone(),
        });
        self.guarded(ticket_id, command, event, || self.gateway.initiate(&request))
            .await?;
        Ok(request)
    }

    async fn transition(
        &self,
        ticket_id: &TicketId,
        command: OrderCommand,
        event: LedgerEvent,
    ) -> Result<RecordedEvent, CommandError> {
        self.guarded(ticket_id, command, event, || {
            self.backend.transition(ticket_id, command)
        })
        .await
    }

    async fn guarded<U, F>(
        &self,
        ticket_id: &TicketId,
        command: OrderCommand,
        event: LedgerEvent,
        upstream: U,
    ) -> Result<RecordedEvent, CommandError>
    where
        U: FnOnce() -> F,
        F: Future<Output = Result<(), UpstreamError>>,
    {
        let result = self.check_call_append(ticket_id, command, event, upstream).await;
        let outcome = result
            .as_ref()
            .map_or_else(CommandError::outcome, |_| OUTCOME_OK);
        metrics::record_command(command.name(), outcome);
        result
    }

    async fn check_call_append<U, F>(
        &self,
        ticket_id: &TicketId,
        command: OrderCommand,
        event: LedgerEvent,
        upstream: U,
    ) -> Result<RecordedEvent, CommandError>
    where
        U: FnOnce() -> F,
        F: Future<Output = Result<(), UpstreamError>>,
    {
        if let Err(err) = order::ensure(&self.state(ticket_id), command) {
            tracing::warn!(ticket_id = %ticket_id, command = %command, error = %err, "Command refused by guard");
            return Err(err.into());
        }

        call_upstream(self.timeout, command.name(), upstream()).await?;

        let mut refusal = None;
        let appended = self
            .ledger
            .log
            .append_if(self.ledger.envelope(event), |events| {
                match order::ensure(&project(events, ticket_id), command) {
                    Ok(()) => true,
                    Err(err) => {
                        refusal = Some(err);
                        false
                    }
                }
            });

        match appended {
            Ok(recorded) => {
                metrics::record_append(recorded.event.event_type());
                Ok(recorded)
            }
            Err(rejected) => {
                let err = refusal.unwrap_or_else(|| {
                    IllegalTransition::new("order", command, format!("at log version {}", rejected.version))
                });
                tracing::info!(
                    ticket_id = %ticket_id,
                    command = %command,
                    error = %err,
                    "Guard no longer holds after upstream call, nothing appended"
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upstream_success_passes_through() {
        call_upstream(Duration::from_secs(1), "confirm", async { Ok(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upstream_error_is_reported() {
        let err = call_upstream(Duration::from_secs(1), "confirm", async {
            Err(UpstreamError::Unavailable("503".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err, CommandError::Upstream(UpstreamError::Unavailable("503".into())));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let timeout = Duration::from_millis(20);
        let err = call_upstream(timeout, "take_payment", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err, CommandError::Timeout(timeout));
    }
}
