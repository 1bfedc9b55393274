use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::CombinedStatus;
use crate::services::bookings;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

use super::auth::authenticate;

pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let principal = authenticate(&state, &headers)?;

    // Strip .ics suffix if present
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let (booking, therapist_name) = {
        let db = state.conn()?;
        let booking = bookings::load_visible(&db, booking_id, &principal)?;
        let therapist_name = queries::get_actor_by_id(&db, &booking.therapist_id)?
            .map(|a| a.display_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "your therapist".to_string());
        (booking, therapist_name)
    };

    let combined = booking.combined_status();
    if !matches!(combined, CombinedStatus::Confirmed | CombinedStatus::Completed) {
        return Err(AppError::Conflict(format!(
            "booking is {combined}; only confirmed bookings can be exported"
        )));
    }

    let ics = generate_ics(&booking, &therapist_name)?;
    let filename = format!("booking-{}.ics", booking.id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
