//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{alias}`     - Public short link redirect
//! - `GET  /health`      - Health check: store, cache, visit queue
//! - `GET  /p/{alias}`   - Private redirect (identity required)
//! - `/api/*`            - Link management and session (identity required)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket on identity-scoped routes
//! - **Identity** - Access/refresh credentials or guest cookie
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, public_redirect_handler};
use crate::api::middleware::rate_limit::{self, RateLimitSettings};
use crate::api::middleware::tracing;
use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// # Errors
///
/// Returns an error if the rate limit settings are unusable (zero rate or
/// burst).
pub fn app_router(state: AppState, limits: &RateLimitSettings) -> Result<NormalizePath<Router>> {
    let protected = rate_limit::apply(api::routes::protected_routes(state.clone()), limits)?;
    let router = assemble(state, protected);

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}

/// Same routes as [`app_router`] without the rate limiter (which needs the
/// peer address) and without path normalization. Used by in-process test
/// servers.
pub fn unlimited_router(state: AppState) -> Router {
    let protected = api::routes::protected_routes(state.clone());
    assemble(state, protected)
}

fn assemble(state: AppState, protected: Router<AppState>) -> Router {
    Router::new()
        .route("/{alias}", get(public_redirect_handler))
        .route("/health", get(health_handler))
        .merge(protected)
        .with_state(state)
        .layer(tracing::layer())
}
