use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, ActorRole};
use crate::services::reports::{self, StatusCounts};
use crate::state::AppState;

use super::auth::require_admin;
use super::bookings::BookingResponse;

// GET /api/admin/status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusCounts>, AppError> {
    require_admin(&state, &headers)?;

    let db = state.conn()?;
    Ok(Json(reports::status_counts(&db)?))
}

// POST /api/admin/actors
#[derive(Deserialize)]
pub struct CreateActorRequest {
    pub role: String,
    pub display_name: String,
}

#[derive(Serialize)]
pub struct CreatedActorResponse {
    id: String,
    role: ActorRole,
    display_name: String,
    token: String,
}

pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateActorRequest>,
) -> Result<(StatusCode, Json<CreatedActorResponse>), AppError> {
    require_admin(&state, &headers)?;

    let role = ActorRole::parse(body.role.trim())
        .ok_or_else(|| AppError::BadRequest(format!("unknown role: {}", body.role)))?;
    let display_name = body.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::BadRequest("display_name is required".to_string()));
    }

    let actor = Actor {
        id: uuid::Uuid::new_v4().to_string(),
        role,
        display_name,
        token: uuid::Uuid::new_v4().to_string(),
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = state.conn()?;
        queries::create_actor(&db, &actor)?;
    }

    tracing::info!(actor_id = %actor.id, role = role.as_str(), "actor registered");

    Ok((
        StatusCode::CREATED,
        Json(CreatedActorResponse {
            id: actor.id,
            role: actor.role,
            display_name: actor.display_name,
            token: actor.token,
        }),
    ))
}

// GET /api/admin/actors
#[derive(Deserialize)]
pub struct ActorsQuery {
    pub role: Option<String>,
}

pub async fn list_actors(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ActorsQuery>,
) -> Result<Json<Vec<Actor>>, AppError> {
    require_admin(&state, &headers)?;

    let role = match query.role.as_deref().filter(|r| !r.is_empty()) {
        Some(r) => Some(
            ActorRole::parse(r).ok_or_else(|| AppError::BadRequest(format!("unknown role: {r}")))?,
        ),
        None => None,
    };

    let db = state.conn()?;
    Ok(Json(queries::list_actors(&db, role)?))
}

// GET /api/admin/reports/completed
#[derive(Deserialize)]
pub struct ReportQuery {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct CompletedReportResponse {
    date: String,
    count: usize,
    total_price: i64,
    bookings: Vec<BookingResponse>,
}

pub async fn completed_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<CompletedReportResponse>, AppError> {
    require_admin(&state, &headers)?;

    let date = match query.date.as_deref().filter(|d| !d.is_empty()) {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest("date must be YYYY-MM-DD".to_string()))?,
        None => Utc::now().date_naive(),
    };

    let report = {
        let db = state.conn()?;
        reports::completed_on(&db, date)?
    };

    Ok(Json(CompletedReportResponse {
        date: report.date.format("%Y-%m-%d").to_string(),
        count: report.count(),
        total_price: report.total_price(),
        bookings: report.bookings.iter().map(BookingResponse::from).collect(),
    }))
}
