//! Routes that act on behalf of a caller.
//!
//! Every route here runs behind [`crate::api::middleware::auth`], so handlers
//! can take [`CallerIdentity`](crate::api::middleware::CallerIdentity).

use crate::api::handlers::{
    create_link_handler, delete_alias_handler, list_links_handler, logout_handler,
    private_redirect_handler, update_link_handler,
};
use crate::api::middleware::auth;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

/// Caller-scoped routes with identity resolution applied.
///
/// # Endpoints
///
/// - `GET    /p/{alias}`            - Redirect one of the caller's private links
/// - `GET    /api/links`            - List the caller's links
/// - `POST   /api/links`            - Create a link
/// - `PATCH  /api/links/{id}`       - Update a link (optimistic `version`)
/// - `DELETE /api/aliases/{alias}`  - Delete the caller's links with an alias
/// - `POST   /api/session/logout`   - Revoke the refresh credential
pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/p/{alias}", get(private_redirect_handler))
        .route(
            "/api/links",
            get(list_links_handler).post(create_link_handler),
        )
        .route("/api/links/{id}", patch(update_link_handler))
        .route("/api/aliases/{alias}", delete(delete_alias_handler))
        .route("/api/session/logout", post(logout_handler))
        .route_layer(middleware::from_fn_with_state(state, auth::layer))
}
