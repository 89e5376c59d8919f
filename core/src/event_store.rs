//! The append-only event log.
//!
//! [`EventLog`] is the single source of truth for every ticket. It is an
//! in-memory, process-local log: callers append [`EventEnvelope`]s and the
//! log assigns each one a [`Sequence`]. Nothing is ever updated or removed
//! except by [`EventLog::reset`], which clears the whole ledger.
//!
//! # Design
//!
//! - The log never validates domain transitions. Guards live in
//!   [`crate::lifecycle`] and are consulted by the command path before
//!   appending; [`EventLog::append_if`] lets that check run under the same
//!   lock as the append.
//! - [`EventLog::get_all`] returns a [`LogSnapshot`]: an `Arc`-shared,
//!   copy-on-write view. Later appends never mutate a snapshot a reader holds.
//! - Every append and every reset bumps [`EventLog::version`], so consumers
//!   can poll or diff the log cheaply.
//! - Listeners are notified after the lock is released and may read from or
//!   append to the log re-entrantly.
//!
//! # Example
//!
//! ```
//! use mise_core::event::{EventEnvelope, LedgerEvent, OrderConfirmed};
//! use mise_core::event_store::EventLog;
//! use mise_core::stream::{EventId, Sequence, TicketId};
//! use chrono::Utc;
//!
//! let log = EventLog::new();
//! let recorded = log.append(EventEnvelope::new(
//!     EventId::new("e-1"),
//!     Utc::now(),
//!     LedgerEvent::OrderConfirmed(OrderConfirmed { ticket_id: TicketId::new("T-1") }),
//! ));
//!
//! assert_eq!(recorded.seq, Sequence::FIRST);
//! assert_eq!(log.get_all().len(), 1);
//! ```

use crate::event::{Event, EventEnvelope, RecordedEvent};
use crate::projection::Projection;
use crate::stream::{Sequence, TicketId};
use crate::subscription::{LiveProjection, LogChange, Subscribers, Subscription};
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// A guarded append was refused because its precondition did not hold
/// against the current log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("append rejected: precondition failed for {event_type} at version {version}")]
pub struct Rejected {
    /// Type name of the event that was not appended.
    pub event_type: &'static str,
    /// Log version the precondition was evaluated against.
    pub version: u64,
}

/// Immutable view of the log at one version.
///
/// Dereferences to `[RecordedEvent]`, so it can be handed to anything that
/// folds a slice of events.
#[derive(Clone, Debug)]
pub struct LogSnapshot {
    events: Arc<Vec<RecordedEvent>>,
    version: u64,
}

impl LogSnapshot {
    /// Version of the log this snapshot was taken at.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The events, in append order.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }
}

impl Deref for LogSnapshot {
    type Target = [RecordedEvent];

    fn deref(&self) -> &Self::Target {
        &self.events
    }
}

impl<'a> IntoIterator for &'a LogSnapshot {
    type Item = &'a RecordedEvent;
    type IntoIter = std::slice::Iter<'a, RecordedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[derive(Debug, Default)]
struct LogState {
    events: Arc<Vec<RecordedEvent>>,
    version: u64,
}

impl LogState {
    fn next_sequence(&self) -> Sequence {
        self.events
            .last()
            .map_or(Sequence::FIRST, |last| last.seq.next())
    }

    fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            events: Arc::clone(&self.events),
            version: self.version,
        }
    }

    fn push(&mut self, envelope: EventEnvelope) -> (RecordedEvent, LogChange) {
        let recorded = RecordedEvent::from_envelope(envelope, self.next_sequence());
        // Clones the vector only if a snapshot still shares it.
        Arc::make_mut(&mut self.events).push(recorded.clone());
        self.version += 1;
        let change = LogChange::Appended {
            seq: recorded.seq,
            ticket_id: recorded.ticket_id().cloned(),
            version: self.version,
        };
        (recorded, change)
    }
}

struct Inner {
    state: RwLock<LogState>,
    subscribers: Arc<Subscribers>,
}

/// Shared handle to an in-memory event log.
///
/// Cloning is cheap and every clone sees the same events. Independent logs
/// (one per test, say) are created with [`EventLog::new`].
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<Inner>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .field("version", &self.version())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(LogState::default()),
                subscribers: Arc::new(Subscribers::default()),
            }),
        }
    }

    /// Appends one event unconditionally and notifies subscribers.
    ///
    /// The log does not check domain transitions; callers consult the
    /// lifecycle guards first (or use [`EventLog::append_if`]).
    pub fn append(&self, envelope: EventEnvelope) -> RecordedEvent {
        let (recorded, change) = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            state.push(envelope)
        };
        self.appended(&recorded, &change);
        recorded
    }

    /// Appends `envelope` only if `precondition` holds for the current
    /// events. The check and the append happen under one write lock, so no
    /// other append can slip in between.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] (and appends nothing) if the precondition fails.
    pub fn append_if<F>(&self, envelope: EventEnvelope, precondition: F) -> Result<RecordedEvent, Rejected>
    where
        F: FnOnce(&[RecordedEvent]) -> bool,
    {
        let (recorded, change) = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !precondition(state.events.as_slice()) {
                return Err(Rejected {
                    event_type: envelope.event.event_type(),
                    version: state.version,
                });
            }
            state.push(envelope)
        };
        self.appended(&recorded, &change);
        Ok(recorded)
    }

    fn appended(&self, recorded: &RecordedEvent, change: &LogChange) {
        tracing::debug!(
            seq = recorded.seq.value(),
            event_type = recorded.event.event_type(),
            ticket_id = recorded.ticket_id().map(TicketId::as_str),
            version = change.version(),
            "event appended"
        );
        self.inner.subscribers.notify(change);
    }

    /// Snapshot of every event in append order.
    #[must_use]
    pub fn get_all(&self) -> LogSnapshot {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Events belonging to one ticket, in append order.
    #[must_use]
    pub fn events_for(&self, ticket_id: &TicketId) -> Vec<RecordedEvent> {
        self.get_all()
            .iter()
            .filter(|recorded| recorded.event.concerns(ticket_id))
            .cloned()
            .collect()
    }

    /// Clears every event. Sequence numbers restart at 1; the version keeps
    /// counting so pollers still observe the change.
    pub fn reset(&self) {
        let (cleared, change) = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let cleared = state.events.len();
            state.events = Arc::new(Vec::new());
            state.version += 1;
            (cleared, LogChange::Reset {
                version: state.version,
            })
        };
        tracing::info!(cleared, version = change.version(), "event log reset");
        self.inner.subscribers.notify(&change);
    }

    /// Monotonic counter bumped by every append and every reset.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .version
    }

    /// Number of events in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }

    /// Whether the log holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence of the most recent event, if any.
    #[must_use]
    pub fn last_sequence(&self) -> Option<Sequence> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .last()
            .map(|recorded| recorded.seq)
    }

    /// Registers `listener` for every append and reset.
    ///
    /// The listener runs synchronously on the appending thread, after the
    /// log's lock is released. Drop the returned [`Subscription`] to stop.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LogChange) + Send + Sync + 'static,
    {
        self.inner.subscribers.add(Arc::new(listener))
    }

    /// Registers `listener` for changes that may affect `ticket_id`: appends
    /// of that ticket's events and resets.
    pub fn watch<F>(&self, ticket_id: TicketId, listener: F) -> Subscription
    where
        F: Fn(&LogChange) + Send + Sync + 'static,
    {
        self.subscribe(move |change| {
            if change.affects(&ticket_id) {
                listener(change);
            }
        })
    }

    /// A lazily recomputed view of entity `id` under `projection`.
    #[must_use]
    pub fn live<P>(&self, projection: P, id: P::Id) -> LiveProjection<P>
    where
        P: Projection,
        P::State: Clone,
    {
        LiveProjection::new(self.clone(), projection, id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::event::{LedgerEvent, OrderConfirmed, OrderPreparing};
    use crate::lifecycle::OrderStatus;
    use crate::projection::{project, OrderProjection};
    use crate::stream::EventId;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    fn envelope(n: u64, event: LedgerEvent) -> EventEnvelope {
        EventEnvelope::new(
            EventId::new(format!("e-{n}")),
            DateTime::<Utc>::UNIX_EPOCH,
            event,
        )
    }

    fn confirmed(ticket: &str) -> LedgerEvent {
        LedgerEvent::OrderConfirmed(OrderConfirmed {
            ticket_id: TicketId::new(ticket),
        })
    }

    fn preparing(ticket: &str) -> LedgerEvent {
        LedgerEvent::OrderPreparing(OrderPreparing {
            ticket_id: TicketId::new(ticket),
        })
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.last_sequence(), None);

        let first = log.append(envelope(1, confirmed("T-1")));
        let second = log.append(envelope(2, confirmed("T-2")));

        assert_eq!(first.seq, Sequence::new(1));
        assert_eq!(second.seq, Sequence::new(2));
        assert_eq!(log.len(), 2);
        assert_eq!(log.last_sequence(), Some(Sequence::new(2)));
        assert_eq!(log.version(), 2);
    }

    #[test]
    fn snapshots_are_immutable() {
        let log = EventLog::new();
        log.append(envelope(1, confirmed("T-1")));
        let before = log.get_all();
        log.append(envelope(2, confirmed("T-2")));

        assert_eq!(before.len(), 1);
        assert_eq!(before.version(), 1);
        assert_eq!(log.get_all().len(), 2);
    }

    #[test]
    fn unguarded_append_accepts_illegal_transitions() {
        let log = EventLog::new();
        log.append(envelope(1, preparing("T-1")));
        assert_eq!(log.len(), 1);
        assert_eq!(project(&log.get_all(), &TicketId::new("T-1")).status, OrderStatus::Pending);
    }

    #[test]
    fn append_if_rejects_without_appending() {
        let log = EventLog::new();
        let ticket = TicketId::new("T-1");
        log.append(envelope(1, confirmed("T-1")));

        let err = log
            .append_if(envelope(2, confirmed("T-1")), |events| {
                project(events, &ticket).status == OrderStatus::Pending
            })
            .unwrap_err();

        assert_eq!(err.event_type, "OrderConfirmed.v1");
        assert_eq!(err.version, 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.version(), 1);
    }

    #[test]
    fn append_if_appends_when_precondition_holds() {
        let log = EventLog::new();
        let recorded = log
            .append_if(envelope(1, confirmed("T-1")), <[RecordedEvent]>::is_empty)
            .unwrap();
        assert_eq!(recorded.seq, Sequence::FIRST);
    }

    #[test]
    fn events_for_filters_by_ticket() {
        let log = EventLog::new();
        log.append(envelope(1, confirmed("T-1")));
        log.append(envelope(2, confirmed("T-2")));
        log.append(envelope(3, LedgerEvent::Unknown));
        log.append(envelope(4, preparing("T-1")));

        let seqs: Vec<u64> = log
            .events_for(&TicketId::new("T-1"))
            .iter()
            .map(|recorded| recorded.seq.value())
            .collect();
        assert_eq!(seqs, vec![1, 4]);
    }

    #[test]
    fn reset_clears_and_restarts_numbering() {
        let log = EventLog::new();
        log.append(envelope(1, confirmed("T-1")));
        log.append(envelope(2, confirmed("T-2")));
        let held = log.get_all();

        log.reset();

        assert!(log.is_empty());
        assert_eq!(log.version(), 3);
        assert_eq!(held.len(), 2);
        let recorded = log.append(envelope(3, confirmed("T-3")));
        assert_eq!(recorded.seq, Sequence::FIRST);
    }

    #[test]
    fn subscribers_see_every_change_in_order() {
        let log = EventLog::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = log.subscribe(move |change| sink.lock().unwrap().push(change.clone()));

        log.append(envelope(1, confirmed("T-1")));
        log.reset();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                LogChange::Appended {
                    seq: Sequence::FIRST,
                    ticket_id: Some(TicketId::new("T-1")),
                    version: 1,
                },
                LogChange::Reset { version: 2 },
            ]
        );
    }

    #[test]
    fn dropped_subscription_is_not_called() {
        let log = EventLog::new();
        let calls = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&calls);
        let subscription = log.subscribe(move |_| *counter.lock().unwrap() += 1);

        log.append(envelope(1, confirmed("T-1")));
        subscription.unsubscribe();
        log.append(envelope(2, confirmed("T-2")));

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn watch_fires_only_for_its_ticket() {
        let log = EventLog::new();
        let calls = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&calls);
        let _watch = log.watch(TicketId::new("T-1"), move |_| *counter.lock().unwrap() += 1);

        log.append(envelope(1, confirmed("T-2")));
        log.append(envelope(2, confirmed("T-1")));
        log.append(envelope(3, LedgerEvent::Unknown));
        log.reset();

        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn listener_may_read_the_log_reentrantly() {
        let log = EventLog::new();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let reader = log.clone();
        let _subscription = log.subscribe(move |_| sink.lock().unwrap().push(reader.len()));

        log.append(envelope(1, confirmed("T-1")));
        log.append(envelope(2, confirmed("T-2")));

        assert_eq!(*observed.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn live_projection_recomputes_only_after_change() {
        let log = EventLog::new();
        let ticket = TicketId::new("T-1");
        let live = log.live(OrderProjection, ticket.clone());

        assert!(live.is_stale());
        assert_eq!(live.get().status, OrderStatus::Pending);
        assert!(!live.is_stale());

        log.append(envelope(1, confirmed("T-2")));
        assert!(live.is_stale());
        assert_eq!(live.get().status, OrderStatus::Pending);

        log.append(envelope(2, confirmed("T-1")));
        assert_eq!(live.get().status, OrderStatus::Confirmed);
        assert_eq!(live.id(), &ticket);

        log.reset();
        assert_eq!(live.get().status, OrderStatus::Pending);
    }
}
