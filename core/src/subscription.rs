//! Change notification for the event log.
//!
//! Listeners registered through [`EventLog::subscribe`] are called
//! synchronously after every append (and after a reset), outside the log's
//! lock. Each registration returns a [`Subscription`]; dropping it (or calling
//! [`Subscription::unsubscribe`]) removes the listener.
//!
//! Consumers that only care about one ticket use [`EventLog::watch`], and
//! consumers that want a view use [`LiveProjection`], which recomputes lazily
//! on the next read after the log's version moves.

use crate::event_store::EventLog;
use crate::projection::Projection;
use crate::stream::{Sequence, TicketId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// What changed in the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogChange {
    /// One event was appended.
    Appended {
        /// Sequence assigned to the event
        seq: Sequence,
        /// Ticket the event belongs to, if any
        ticket_id: Option<TicketId>,
        /// Log version after the append
        version: u64,
    },
    /// The log was cleared.
    Reset {
        /// Log version after the reset
        version: u64,
    },
}

impl LogChange {
    /// Log version after this change.
    #[must_use]
    pub const fn version(&self) -> u64 {
        match self {
            Self::Appended { version, .. } | Self::Reset { version } => *version,
        }
    }

    /// Whether views of `ticket_id` may be out of date after this change.
    #[must_use]
    pub fn affects(&self, ticket_id: &TicketId) -> bool {
        match self {
            Self::Appended {
                ticket_id: Some(owner),
                ..
            } => owner == ticket_id,
            Self::Appended { ticket_id: None, .. } => false,
            Self::Reset { .. } => true,
        }
    }
}

type Listener = Arc<dyn Fn(&LogChange) + Send + Sync>;

/// Registered listeners of one log.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl Subscribers {
    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(listener_id, _)| *listener_id != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Calls every listener registered at the time of the call. The list is
    /// copied first so listeners may subscribe, unsubscribe or append.
    pub(crate) fn notify(&self, change: &LogChange) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(change);
        }
    }
}

/// Handle for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Subscribers>,
}

impl Subscription {
    /// Removes the listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// A cached projection of one entity that recomputes on the first read after
/// the log changed.
///
/// ```
/// use mise_core::event::{EventEnvelope, LedgerEvent, OrderConfirmed};
/// use mise_core::event_store::EventLog;
/// use mise_core::lifecycle::OrderStatus;
/// use mise_core::projection::OrderProjection;
/// use mise_core::stream::{EventId, TicketId};
/// use mise_core::subscription::LiveProjection;
/// use chrono::Utc;
///
/// let log = EventLog::new();
/// let ticket = TicketId::new("T-1");
/// let live = LiveProjection::new(log.clone(), OrderProjection, ticket.clone());
/// assert_eq!(live.get().status, OrderStatus::Pending);
///
/// log.append(EventEnvelope::new(
///     EventId::new("e-1"),
///     Utc::now(),
///     LedgerEvent::OrderConfirmed(OrderConfirmed { ticket_id: ticket }),
/// ));
/// assert!(live.is_stale());
/// assert_eq!(live.get().status, OrderStatus::Confirmed);
/// ```
pub struct LiveProjection<P: Projection> {
    log: EventLog,
    projection: P,
    id: P::Id,
    cache: Mutex<Option<(u64, P::State)>>,
}

impl<P> LiveProjection<P>
where
    P: Projection,
    P::State: Clone,
{
    /// Creates a view of entity `id` over `log`. Nothing is computed until
    /// the first [`LiveProjection::get`].
    #[must_use]
    pub const fn new(log: EventLog, projection: P, id: P::Id) -> Self {
        Self {
            log,
            projection,
            id,
            cache: Mutex::new(None),
        }
    }

    /// Current state, recomputed from a fresh snapshot if the log moved since
    /// the last read.
    pub fn get(&self) -> P::State {
        let snapshot = self.log.get_all();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((version, state)) = cache.as_ref() {
            if *version == snapshot.version() {
                return state.clone();
            }
        }
        let state = self.projection.project(&snapshot, &self.id);
        tracing::trace!(
            projection = self.projection.name(),
            version = snapshot.version(),
            "recomputed live projection"
        );
        *cache = Some((snapshot.version(), state.clone()));
        state
    }

    /// Whether the next [`LiveProjection::get`] will recompute.
    pub fn is_stale(&self) -> bool {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .as_ref()
            .is_none_or(|(version, _)| *version != self.log.version())
    }

    /// The entity this view follows.
    pub const fn id(&self) -> &P::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_affects_owning_ticket_only() {
        let ticket = TicketId::new("T-1");
        let appended = LogChange::Appended {
            seq: Sequence::FIRST,
            ticket_id: Some(ticket.clone()),
            version: 1,
        };
        assert!(appended.affects(&ticket));
        assert!(!appended.affects(&TicketId::new("T-2")));
        assert!(LogChange::Reset { version: 2 }.affects(&ticket));
        assert_eq!(appended.version(), 1);
    }

    #[test]
    fn dropping_subscription_removes_listener() {
        let subscribers = Arc::new(Subscribers::default());
        let first = subscribers.add(Arc::new(|_: &LogChange| {}));
        let second = subscribers.add(Arc::new(|_: &LogChange| {}));
        assert_eq!(subscribers.len(), 2);
        drop(first);
        assert_eq!(subscribers.len(), 1);
        second.unsubscribe();
        assert_eq!(subscribers.len(), 0);
    }
}
