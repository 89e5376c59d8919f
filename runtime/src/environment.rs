//! The ledger environment handed to every command handler.

use mise_core::environment::{Clock, IdGenerator, SystemClock};
use mise_core::event::{EventEnvelope, LedgerEvent};
use mise_core::event_store::EventLog;
use mise_core::stream::{EventId, SessionId};
use std::sync::Arc;
use uuid::Uuid;

/// Random v4 UUIDs for event and session ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn event_id(&self) -> EventId {
        EventId::new(Uuid::new_v4().to_string())
    }

    fn session_id(&self) -> SessionId {
        SessionId::new(format!("ps_{}", Uuid::new_v4().simple()))
    }
}

/// Shared dependencies of the command layer: the log plus injected time and
/// id sources.
#[derive(Clone)]
pub struct Ledger {
    /// The event log every command appends to
    pub log: EventLog,
    /// Timestamp source for envelopes
    pub clock: Arc<dyn Clock>,
    /// Event and session id source
    pub ids: Arc<dyn IdGenerator>,
}

impl Ledger {
    /// Creates a ledger environment from its parts.
    #[must_use]
    pub fn new(log: EventLog, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { log, clock, ids }
    }

    /// A fresh log with wall-clock time and random ids.
    #[must_use]
    pub fn system() -> Self {
        Self::new(EventLog::new(), Arc::new(SystemClock), Arc::new(UuidGenerator))
    }

    /// Wraps `event` with a fresh id and the current time.
    #[must_use]
    pub fn envelope(&self, event: LedgerEvent) -> EventEnvelope {
        EventEnvelope::new(self.ids.event_id(), self.clock.now(), event)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").field("log", &self.log).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        let ids = UuidGenerator;
        assert_ne!(ids.event_id(), ids.event_id());
        let session = ids.session_id();
        assert!(session.as_str().starts_with("ps_"));
        assert_ne!(session, ids.session_id());
    }

    #[test]
    fn system_ledger_starts_empty() {
        let ledger = Ledger::system();
        assert!(ledger.log.is_empty());
        let envelope = ledger.envelope(LedgerEvent::Unknown);
        assert_eq!(envelope.event, LedgerEvent::Unknown);
    }
}
