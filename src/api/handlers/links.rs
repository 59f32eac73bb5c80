//! Handlers for link management endpoints (create, list, update, delete).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::links::{CreateLinkRequest, LinkListResponse, LinkResponse, UpdateLinkRequest};
use crate::api::middleware::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a link owned by the caller.
///
/// # Endpoint
///
/// `POST /api/links`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/docs",
///   "alias": "docs",                       // optional
///   "private": false,                      // optional, users only
///   "expires_at": "2030-01-01T00:00:00Z"   // optional
/// }
/// ```
///
/// # Errors
///
/// - 400 Bad Request for an invalid URL, alias or past expiry
/// - 401 Unauthorized when a guest asks for a private link
/// - 409 Conflict if the alias is taken in its namespace
pub async fn create_link_handler(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let link = state.link_service.create(&caller, payload.into()).await?;

    Ok((StatusCode::CREATED, Json(link.into())))
}

/// Lists the caller's links, newest first.
///
/// # Endpoint
///
/// `GET /api/links`
pub async fn list_links_handler(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<LinkListResponse>, AppError> {
    let links = state.link_service.list(&caller).await?;

    Ok(Json(LinkListResponse {
        total: links.len(),
        items: links.into_iter().map(LinkResponse::from).collect(),
    }))
}

/// Updates one of the caller's links with optimistic concurrency.
///
/// # Endpoint
///
/// `PATCH /api/links/{id}`
///
/// # Errors
///
/// - 400 Bad Request if nothing would change or a field is invalid
/// - 404 Not Found if the link is missing, not the caller's, or `version` is
///   stale
pub async fn update_link_handler(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;
    let (version, patch) = payload.into_patch();

    let link = state.link_service.update(&caller, id, version, patch).await?;

    Ok(Json(link.into()))
}

/// Deletes the caller's links with `alias`, public and private alike.
///
/// # Endpoint
///
/// `DELETE /api/aliases/{alias}`
///
/// Returns 204 No Content, or 404 Not Found when the caller has no such alias.
pub async fn delete_alias_handler(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(alias): Path<String>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete(&caller, &alias).await?;

    Ok(StatusCode::NO_CONTENT)
}
