//! proptest strategies for event logs.
//!
//! Logs draw from a small pool of tickets and session ids so that generated
//! sequences actually collide: repeated transitions, stale resolutions,
//! superseded sessions and events for other tickets all show up often.

use crate::fixtures;
use mise_core::event::LedgerEvent;
use proptest::prelude::*;

/// Tickets used by [`arb_event`].
pub const TICKETS: [&str; 3] = ["T-1", "T-2", "T-3"];

/// Sessions used by [`arb_event`].
pub const SESSIONS: [&str; 3] = ["s-1", "s-2", "s-3"];

/// One of [`TICKETS`].
pub fn arb_ticket() -> impl Strategy<Value = &'static str> {
    prop::sample::select(TICKETS.to_vec())
}

/// One of [`SESSIONS`].
pub fn arb_session() -> impl Strategy<Value = &'static str> {
    prop::sample::select(SESSIONS.to_vec())
}

/// Any event of the taxonomy (plus `Unknown`) for one of [`TICKETS`].
pub fn arb_event() -> impl Strategy<Value = LedgerEvent> {
    prop_oneof![
        arb_ticket().prop_map(fixtures::confirmed),
        arb_ticket().prop_map(fixtures::preparing),
        arb_ticket().prop_map(fixtures::ready),
        arb_ticket().prop_map(fixtures::completed),
        (arb_ticket(), prop::option::of("[a-z]{1,8}"))
            .prop_map(|(ticket, reason)| fixtures::cancelled(ticket, reason.as_deref())),
        (arb_ticket(), arb_session(), 1_i64..10_000)
            .prop_map(|(ticket, session, cents)| fixtures::initiated(ticket, session, cents)),
        (arb_ticket(), arb_session())
            .prop_map(|(ticket, session)| fixtures::succeeded(ticket, session)),
        (arb_ticket(), arb_session())
            .prop_map(|(ticket, session)| fixtures::failed(ticket, session, "declined")),
        (arb_ticket(), 0_i64..50_000, prop::option::of(Just("C-1")))
            .prop_map(|(ticket, cents, customer)| fixtures::sale(ticket, cents, customer)),
        Just(LedgerEvent::Unknown),
    ]
}

/// A log of up to `max_len` events.
pub fn arb_log(max_len: usize) -> impl Strategy<Value = Vec<LedgerEvent>> {
    prop::collection::vec(arb_event(), 0..=max_len)
}
