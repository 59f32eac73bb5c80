//! Handler for ending a session.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::middleware::CallerIdentity;
use crate::api::middleware::auth::{append_cookie, clear_refresh_cookie};
use crate::error::AppError;
use crate::state::AppState;

/// Revokes the caller's refresh state and clears the refresh cookie.
///
/// # Endpoint
///
/// `POST /api/session/logout`
///
/// The access credential stays valid until it expires; it cannot be rotated
/// afterwards.
pub async fn logout_handler(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Response, AppError> {
    state.identity_resolver.logout(&caller).await?;
    tracing::info!(owner = %caller, "Session revoked");

    let mut response = StatusCode::NO_CONTENT.into_response();
    append_cookie(response.headers_mut(), &clear_refresh_cookie(&state.cookies));
    Ok(response)
}
