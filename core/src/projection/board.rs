//! Whole-log views for the ticket board and kitchen display.

use super::{OrderProjection, OrderState, Projection};
use crate::event::RecordedEvent;
use crate::lifecycle::OrderStatus;
use crate::stream::TicketId;
use std::collections::BTreeMap;

/// Projects every ticket that appears in `events`, in one pass.
///
/// Equivalent to calling [`project`](super::project) once per ticket.
#[must_use]
pub fn project_all(events: &[RecordedEvent]) -> BTreeMap<TicketId, OrderState> {
    let projection = OrderProjection;
    let mut tickets: BTreeMap<TicketId, OrderState> = BTreeMap::new();
    for recorded in events {
        let Some(ticket_id) = recorded.ticket_id() else {
            continue;
        };
        let state = tickets
            .entry(ticket_id.clone())
            .or_insert_with(|| projection.initial(ticket_id));
        projection.apply(state, recorded);
    }
    tickets
}

/// Tickets the kitchen is working on (confirmed, preparing or ready), oldest
/// activity first.
#[must_use]
pub fn kitchen_queue(events: &[RecordedEvent]) -> Vec<OrderState> {
    let mut queue: Vec<OrderState> = project_all(events)
        .into_values()
        .filter(|state| {
            matches!(
                state.status,
                OrderStatus::Confirmed | OrderStatus::Preparing | OrderStatus::Ready
            )
        })
        .collect();
    queue.sort_by_key(|state| state.last_event_seq);
    queue
}
