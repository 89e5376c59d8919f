//! Upstream collaborators the command layer calls before appending.
//!
//! The ledger records facts only after the system that owns them has
//! accepted the request: the order API for ticket transitions and sales, the
//! payment gateway for payment sessions. Both are traits so the console can
//! plug in real clients and tests can plug in fakes.
//!
//! The command layer asks for a call only after the guard has passed, so a
//! refused command never reaches upstream.

use crate::error::UpstreamError;
use mise_core::lifecycle::OrderCommand;
use mise_core::stream::{CustomerId, SessionId, TicketId};
use mise_core::types::{Money, PaymentProvider, Totals};
use std::future::Future;

/// The order API.
pub trait OrderBackend: Send + Sync {
    /// Asks upstream to perform a ticket transition (`confirm`, `cancel`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if upstream refuses or cannot be reached.
    fn transition(
        &self,
        ticket_id: &TicketId,
        command: OrderCommand,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send;

    /// Sends sale totals for a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if upstream refuses or cannot be reached.
    fn record_sale(
        &self,
        ticket_id: &TicketId,
        totals: &Totals,
        customer_id: Option<&CustomerId>,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send;
}

/// One payment attempt as sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Ticket being paid
    pub ticket_id: TicketId,
    /// Fresh id of this attempt
    pub session_id: SessionId,
    /// Tender
    pub provider: PaymentProvider,
    /// Amount to charge
    pub amount: Money,
}

/// The payment gateway.
///
/// Only session initiation goes through the gateway synchronously. Outcomes
/// arrive later and are recorded with
/// [`OrderCommands::resolve_payment`](crate::commands::OrderCommands::resolve_payment).
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment session with the provider.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if the provider refuses or cannot be reached.
    fn initiate(
        &self,
        request: &PaymentRequest,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send;
}
