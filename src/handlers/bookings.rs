use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingScope};
use crate::errors::AppError;
use crate::models::{Booking, CombinedStatus, EventKind, PendingPartyHint, Principal, SideStatus};
use crate::services::bookings::{self, NewBooking};
use crate::services::events;
use crate::services::reconcile::{reconcile, Reconciled, StatusRecord};
use crate::state::AppState;

use super::auth::authenticate;

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub client_id: String,
    pub therapist_id: String,
    pub store_id: Option<String>,
    pub date_time: String,
    pub duration_minutes: i32,
    pub price: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub therapist_status: SideStatus,
    pub store_status: Option<SideStatus>,
    pub combined_status: CombinedStatus,
    pub combined_label: &'static str,
    pub hint: Option<PendingPartyHint>,
    pub hint_label: Option<&'static str>,
    pub can_check_in: bool,
    pub can_cancel: bool,
    pub checked_in_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Booking> for BookingResponse {
    fn from(b: &Booking) -> Self {
        let combined = b.combined_status();
        let hint = b.hint();
        Self {
            id: b.id.clone(),
            client_id: b.client_id.clone(),
            therapist_id: b.therapist_id.clone(),
            store_id: b.store_id.clone(),
            date_time: b.date_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            duration_minutes: b.duration_minutes,
            price: b.price,
            location: b.location.clone(),
            notes: b.notes.clone(),
            therapist_status: b.therapist_status,
            store_status: b.store_status,
            combined_status: combined,
            combined_label: combined.label(),
            hint,
            hint_label: hint.map(|h| h.label()),
            can_check_in: combined.can_check_in() && b.checked_in_at.is_none(),
            can_cancel: combined.can_cancel(),
            checked_in_at: b
                .checked_in_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub therapist_id: String,
    pub store_id: Option<String>,
    pub date_time: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub price: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let principal = authenticate(&state, &headers)?;
    let client = principal
        .actor()
        .ok_or_else(|| AppError::Forbidden("only clients can request bookings".to_string()))?;

    let date_time = NaiveDateTime::parse_from_str(body.date_time.trim(), "%Y-%m-%d %H:%M")
        .map_err(|_| AppError::BadRequest("date_time must be YYYY-MM-DD HH:MM".to_string()))?;

    let new = NewBooking {
        therapist_id: body.therapist_id,
        store_id: body.store_id.filter(|s| !s.is_empty()),
        date_time,
        duration_minutes: body.duration_minutes,
        price: body.price,
        location: body.location,
        notes: body.notes,
    };

    let booking = {
        let db = state.conn()?;
        bookings::create_booking(&db, client, new)?
    };

    events::record_event(
        &state,
        &booking.id,
        EventKind::Created,
        booking.combined_status(),
        "",
    );

    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let principal = authenticate(&state, &headers)?;
    let db = state.conn()?;
    let booking = bookings::load_visible(&db, &id, &principal)?;
    Ok(Json(BookingResponse::from(&booking)))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let principal = authenticate(&state, &headers)?;

    let status_filter = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            CombinedStatus::parse_filter(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status filter: {s}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(50);

    let scope = match &principal {
        Principal::Admin => BookingScope::All,
        Principal::Actor(actor) => BookingScope::for_actor(actor),
    };

    // Combined status is derived, so the filter runs after reconciliation
    let all = {
        let db = state.conn()?;
        queries::list_bookings(&db, &scope, None)?
    };

    let response = all
        .iter()
        .filter(|b| status_filter.map_or(true, |s| b.combined_status() == s))
        .take(limit)
        .map(BookingResponse::from)
        .collect();

    Ok(Json(response))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let principal = authenticate(&state, &headers)?;
    let next = SideStatus::parse_strict(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status: {}", body.status)))?;

    let change = {
        let db = state.conn()?;
        bookings::set_side_status(&db, &id, &principal, next)?
    };

    events::publish_status_change(&state, &change);

    Ok(Json(BookingResponse::from(&change.booking)))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let principal = authenticate(&state, &headers)?;

    let changes = {
        let db = state.conn()?;
        bookings::cancel_booking(&db, &id, &principal)?
    };

    for change in &changes {
        events::publish_status_change(&state, change);
    }

    let latest = changes
        .last()
        .map(|c| &c.booking)
        .ok_or_else(|| AppError::Conflict("nothing was cancelled".to_string()))?;
    Ok(Json(BookingResponse::from(latest)))
}

// POST /api/bookings/:id/check-in
pub async fn check_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let principal = authenticate(&state, &headers)?;
    let now = Utc::now().naive_utc();

    let booking = {
        let db = state.conn()?;
        bookings::check_in(&db, &id, &principal, &now)?
    };

    events::record_event(
        &state,
        &booking.id,
        EventKind::CheckedIn,
        booking.combined_status(),
        "",
    );

    Ok(Json(BookingResponse::from(&booking)))
}

// POST /api/reconcile
pub async fn reconcile_status(Json(record): Json<StatusRecord>) -> Json<Reconciled> {
    Json(reconcile(&record))
}
