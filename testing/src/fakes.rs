//! Fake upstream collaborators.
//!
//! Both fakes record every call they receive and can be scripted to fail or
//! to take a while. By default each call yields to the executor once before
//! answering, so concurrently issued commands interleave the way they would
//! against a real network client.

use mise_core::lifecycle::OrderCommand;
use mise_core::stream::{CustomerId, TicketId};
use mise_core::types::Totals;
use mise_runtime::{OrderBackend, PaymentGateway, PaymentRequest, UpstreamError};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    failure: Mutex<Option<UpstreamError>>,
    delay: Mutex<Option<Duration>>,
}

impl Script {
    fn fail_with(&self, error: UpstreamError) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    fn succeed(&self) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    async fn answer(&self) -> Result<(), UpstreamError> {
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        let failure = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        failure.map_or(Ok(()), Err)
    }
}

/// A call received by [`FakeOrderBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCall {
    /// `transition(ticket, command)`
    Transition(TicketId, OrderCommand),
    /// `record_sale(ticket, totals, customer)`
    RecordSale(TicketId, Totals, Option<CustomerId>),
}

/// Scriptable [`OrderBackend`].
#[derive(Debug, Default)]
pub struct FakeOrderBackend {
    calls: Mutex<Vec<OrderCall>>,
    script: Script,
}

impl FakeOrderBackend {
    /// A backend that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later call fails with `error`.
    #[must_use]
    pub fn failing(error: UpstreamError) -> Self {
        let backend = Self::new();
        backend.script.fail_with(error);
        backend
    }

    /// Every later call takes `delay` before answering.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.script.set_delay(delay);
        self
    }

    /// Makes every later call fail with `error`.
    pub fn fail_with(&self, error: UpstreamError) {
        self.script.fail_with(error);
    }

    /// Makes every later call succeed.
    pub fn succeed(&self) {
        self.script.succeed();
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<OrderCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: OrderCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl OrderBackend for FakeOrderBackend {
    async fn transition(&self, ticket_id: &TicketId, command: OrderCommand) -> Result<(), UpstreamError> {
        self.record(OrderCall::Transition(ticket_id.clone(), command));
        self.script.answer().await
    }

    async fn record_sale(
        &self,
        ticket_id: &TicketId,
        totals: &Totals,
        customer_id: Option<&CustomerId>,
    ) -> Result<(), UpstreamError> {
        self.record(OrderCall::RecordSale(ticket_id.clone(), *totals, customer_id.cloned()));
        self.script.answer().await
    }
}

/// Scriptable [`PaymentGateway`].
#[derive(Debug, Default)]
pub struct FakePaymentGateway {
    requests: Mutex<Vec<PaymentRequest>>,
    script: Script,
}

impl FakePaymentGateway {
    /// A gateway that opens every session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later initiation fails with `error`.
    #[must_use]
    pub fn failing(error: UpstreamError) -> Self {
        let gateway = Self::new();
        gateway.script.fail_with(error);
        gateway
    }

    /// Every later initiation takes `delay` before answering.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.script.set_delay(delay);
        self
    }

    /// Makes every later initiation fail with `error`.
    pub fn fail_with(&self, error: UpstreamError) {
        self.script.fail_with(error);
    }

    /// Makes every later initiation succeed.
    pub fn succeed(&self) {
        self.script.succeed();
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PaymentGateway for FakePaymentGateway {
    async fn initiate(&self, request: &PaymentRequest) -> Result<(), UpstreamError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.script.answer().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn backend_records_calls_and_follows_script() {
        let backend = FakeOrderBackend::new();
        let ticket = TicketId::new("T-1");
        backend.transition(&ticket, OrderCommand::Confirm).await.unwrap();

        backend.fail_with(UpstreamError::Unavailable("down".into()));
        let err = backend.transition(&ticket, OrderCommand::Cancel).await.unwrap_err();
        assert_eq!(err, UpstreamError::Unavailable("down".into()));

        backend.succeed();
        backend.transition(&ticket, OrderCommand::Cancel).await.unwrap();
        assert_eq!(backend.calls().len(), 3);
        assert_eq!(backend.calls()[0], OrderCall::Transition(ticket, OrderCommand::Confirm));
    }
}
