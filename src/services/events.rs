use crate::db::queries;
use crate::models::{CombinedStatus, EventKind, SideStatus};
use crate::services::bookings::StatusChange;
use crate::state::AppState;

/// Persist a booking event and fan it out to live subscribers.
///
/// Must be called without holding the database lock.
pub fn record_event(
    state: &AppState,
    booking_id: &str,
    kind: EventKind,
    combined_status: CombinedStatus,
    detail: &str,
) {
    let event = match state.conn() {
        Ok(db) => queries::insert_booking_event(&db, booking_id, kind, combined_status, detail),
        Err(e) => Err(anyhow::anyhow!(e.to_string())),
    };

    match event {
        Ok(event) => {
            // No receivers is fine
            let _ = state.events_tx.send(event);
        }
        Err(e) => {
            tracing::error!(error = %e, booking_id, "failed to record booking event");
        }
    }
}

pub fn publish_status_change(state: &AppState, change: &StatusChange) {
    if change.is_noop() {
        return;
    }

    let current = change.current();
    let kind = if change.to == SideStatus::Cancelled {
        EventKind::Cancelled
    } else {
        EventKind::StatusChanged
    };
    let detail = format!("{}: {} -> {}", change.side, change.from, change.to);
    record_event(state, &change.booking.id, kind, current, &detail);

    if change.notify_client() {
        record_event(
            state,
            &change.booking.id,
            EventKind::ClientNotified,
            current,
            current.client_message(),
        );
    }
}
