use axum::http::HeaderMap;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Principal;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the bearer token to the admin or to a registered actor.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;

    if token == state.config.admin_token {
        return Ok(Principal::Admin);
    }

    let db = state.conn()?;
    queries::get_actor_by_token(&db, token)?
        .map(Principal::Actor)
        .ok_or(AppError::Unauthorized)
}

pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    match authenticate(state, headers)? {
        Principal::Admin => Ok(()),
        Principal::Actor(_) => Err(AppError::Forbidden("admin only".to_string())),
    }
}
