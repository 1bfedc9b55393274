pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/reconcile", post(handlers::bookings::reconcile_status))
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/status",
            post(handlers::bookings::update_status),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/check-in",
            post(handlers::bookings::check_in),
        )
        .route("/api/events", get(handlers::events::events_stream))
        .route("/api/admin/status", get(handlers::admin::get_status))
        .route(
            "/api/admin/actors",
            get(handlers::admin::list_actors).post(handlers::admin::create_actor),
        )
        .route(
            "/api/admin/reports/completed",
            get(handlers::admin::completed_report),
        )
        .route(
            "/calendar/:booking_id",
            get(handlers::calendar::download_ics),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
