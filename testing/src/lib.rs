//! # Mise Testing
//!
//! Testing utilities for the Mise ledger.
//!
//! This crate provides:
//! - Deterministic environment implementations (fixed clock, sequential ids)
//! - Event fixtures
//! - Fake upstream collaborators with scripted failures and delays
//! - A given/then harness over a real event log
//! - proptest strategies for event logs
//!
//! ## Example
//!
//! ```
//! use mise_testing::{LedgerTestHarness, fixtures};
//! use mise_core::lifecycle::{OrderCommand, OrderStatus};
//! use mise_core::projection::PaymentStatus;
//!
//! let mut harness = LedgerTestHarness::new();
//! harness
//!     .given(vec![
//!         fixtures::confirmed("T-1"),
//!         fixtures::initiated("T-1", "s-1", 1_250),
//!     ])
//!     .then_status("T-1", OrderStatus::Confirmed)
//!     .then_payment("T-1", PaymentStatus::Pending)
//!     .then_forbids("T-1", OrderCommand::TakePayment);
//! ```

use chrono::{DateTime, Utc};
use mise_core::environment::{Clock, IdGenerator};

pub mod fakes;
pub mod fixtures;
pub mod harness;
pub mod properties;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use mise_core::stream::{EventId, SessionId};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock pinned to one instant, so recorded timestamps are reproducible.
    ///
    /// ```
    /// use mise_testing::mocks::FixedClock;
    /// use mise_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let opening = FixedClock::new(Utc::now());
    /// assert_eq!(opening.now(), opening.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        at: DateTime<Utc>,
    }

    impl FixedClock {
        /// Pins the clock at `at`.
        #[must_use]
        pub const fn new(at: DateTime<Utc>) -> Self {
            Self { at }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.at
        }
    }

    /// Seconds from the epoch to 2025-01-01 00:00:00 UTC.
    const SERVICE_DAY: i64 = 1_735_689_600;

    /// The clock every test ledger uses: 2025-01-01 00:00:00 UTC.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::from_timestamp(SERVICE_DAY, 0).unwrap_or_default())
    }

    /// Predictable ids: `evt-1`, `evt-2`, ... and `ps-1`, `ps-2`, ...
    #[derive(Debug, Default)]
    pub struct SequentialIds {
        events: AtomicU64,
        sessions: AtomicU64,
    }

    impl SequentialIds {
        /// Starts both counters at 1.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl IdGenerator for SequentialIds {
        fn event_id(&self) -> EventId {
            let n = self.events.fetch_add(1, Ordering::Relaxed) + 1;
            EventId::new(format!("evt-{n}"))
        }

        fn session_id(&self) -> SessionId {
            let n = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
            SessionId::new(format!("ps-{n}"))
        }
    }
}

// Re-export commonly used items
pub use fakes::{FakeOrderBackend, FakePaymentGateway};
pub use harness::LedgerTestHarness;
pub use mocks::{FixedClock, SequentialIds, test_clock};

/// A [`Ledger`](mise_runtime::Ledger) over a fresh log with
/// [`test_clock`] and [`SequentialIds`].
#[must_use]
pub fn test_ledger() -> mise_runtime::Ledger {
    mise_runtime::Ledger::new(
        mise_core::event_store::EventLog::new(),
        std::sync::Arc::new(test_clock()),
        std::sync::Arc::new(SequentialIds::new()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_pinned_to_new_year() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn sequential_ids_count_independently() {
        let ids = SequentialIds::new();
        assert_eq!(ids.event_id().as_str(), "evt-1");
        assert_eq!(ids.event_id().as_str(), "evt-2");
        assert_eq!(ids.session_id().as_str(), "ps-1");
    }

    #[test]
    fn test_ledger_stamps_fixed_time() {
        let ledger = test_ledger();
        let envelope = ledger.envelope(mise_core::event::LedgerEvent::Unknown);
        assert_eq!(envelope.at, test_clock().now());
        assert_eq!(envelope.id.as_str(), "evt-1");
    }
}
