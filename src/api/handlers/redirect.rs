//! Handlers for short link redirects.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::api::middleware::CallerIdentity;
use crate::application::services::RedirectRoute;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a public alias to its target.
///
/// # Endpoint
///
/// `GET /{alias}`
///
/// # Request Flow
///
/// 1. Check the cache under the public key
/// 2. On a miss, look the alias up among public links and populate the cache
/// 3. Queue a visit event for the background worker (dropped when full)
/// 4. Return 307 Temporary Redirect
///
/// # Errors
///
/// Returns 404 Not Found if the alias is unknown or expired.
pub async fn public_redirect_handler(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<Redirect, AppError> {
    let target = state
        .link_service
        .redirect(None, &alias, RedirectRoute::Public)
        .await?;

    Ok(Redirect::temporary(&target.url))
}

/// Redirects one of the caller's private aliases.
///
/// # Endpoint
///
/// `GET /p/{alias}` (behind the auth middleware)
///
/// # Errors
///
/// - 401 Unauthorized for guests
/// - 404 Not Found when the caller owns no private link with this alias,
///   including when another user does
pub async fn private_redirect_handler(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(alias): Path<String>,
) -> Result<Redirect, AppError> {
    let target = state
        .link_service
        .redirect(Some(&caller), &alias, RedirectRoute::Private)
        .await?;

    Ok(Redirect::temporary(&target.url))
}
