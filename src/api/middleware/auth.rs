//! Identity middleware: access/refresh credentials and guest cookies.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_auth::AuthBearer;
use serde_json::json;

use crate::application::services::{RequestCredentials, Resolution};
use crate::domain::entities::{Identity, RefreshCredential};
use crate::error::AppError;
use crate::state::{AppState, CookieSettings};

pub const REFRESH_COOKIE: &str = "tl_refresh";
pub const GUEST_COOKIE: &str = "tl_guest";

/// The identity a request acts as, attached by [`layer`].
///
/// Handlers take it as an extractor. On a route that is not behind the
/// middleware it rejects with `401 unauthenticated` instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::unauthenticated("Authentication required", json!({})))
    }
}

/// Resolves the caller's identity and enforces it for the rest of the request.
///
/// # Credentials
///
/// ```text
/// Authorization: Bearer <access>
/// Cookie: tl_refresh=<refresh>; tl_guest=<uuid>
/// ```
///
/// # Flow
///
/// 1. No `Authorization` header: act as the guest from `tl_guest`, minting
///    (and setting) a new guest cookie when absent or unusable
/// 2. Valid access credential: act as its subject
/// 3. Expired access credential: rotate through `tl_refresh`; the response
///    carries the new access credential and a replaced refresh cookie
/// 4. Anything else: generic `401 Unauthorized`. A stale or replayed refresh
///    credential also revokes the owner's refresh state and clears the cookie
///
/// Authenticated responses always carry the current access credential in the
/// `Authorization` response header.
///
/// # Example
///
/// ```rust,ignore
/// let protected = Router::new()
///     .route("/links", get(list_links_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));
/// ```
pub async fn layer(State(st): State<AppState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let bearer = if parts.headers.contains_key(header::AUTHORIZATION) {
        match AuthBearer::from_request_parts(&mut parts, &()).await {
            Ok(AuthBearer(token)) => Some(token),
            Err(_) => {
                tracing::info!("Malformed Authorization header");
                return unauthorized(false, &st.cookies);
            }
        }
    } else {
        None
    };

    let refresh = read_cookie(&parts.headers, REFRESH_COOKIE).map(str::to_owned);
    let guest = read_cookie(&parts.headers, GUEST_COOKIE).map(str::to_owned);

    let resolution = st
        .identity_resolver
        .resolve(RequestCredentials {
            bearer: bearer.as_deref(),
            refresh: refresh.as_deref(),
            guest: guest.as_deref(),
        })
        .await;
    tracing::debug!(state = ?resolution.state(), "Resolved request identity");

    match resolution {
        Resolution::Rejected { clear_refresh } => unauthorized(clear_refresh, &st.cookies),

        Resolution::Guest { identity, minted } => {
            let guest_cookie = minted.then(|| guest_cookie(&identity, &st.cookies));
            parts.extensions.insert(CallerIdentity(identity));

            let mut response = next.run(Request::from_parts(parts, body)).await;
            if let Some(cookie) = guest_cookie {
                append_cookie(response.headers_mut(), &cookie);
            }
            response
        }

        Resolution::Authenticated {
            identity,
            access,
            rotated,
        } => {
            parts.extensions.insert(CallerIdentity(identity));

            let mut response = next.run(Request::from_parts(parts, body)).await;
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {access}")) {
                response.headers_mut().insert(header::AUTHORIZATION, value);
            }
            if let Some(refresh) = rotated {
                append_cookie(response.headers_mut(), &refresh_cookie(&refresh, &st.cookies));
            }
            response
        }
    }
}

fn unauthorized(clear_refresh: bool, cookies: &CookieSettings) -> Response {
    let mut response = AppError::unauthorized("Unauthorized", json!({})).into_response();
    if clear_refresh {
        append_cookie(response.headers_mut(), &clear_refresh_cookie(cookies));
    }
    response
}

/// Returns the value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name && !value.is_empty()).then_some(value)
        })
}

fn cookie_attributes(cookies: &CookieSettings, same_site: &str) -> String {
    let secure = if cookies.secure { "; Secure" } else { "" };
    format!("Path=/; HttpOnly; SameSite={same_site}{secure}")
}

pub fn refresh_cookie(refresh: &RefreshCredential, cookies: &CookieSettings) -> String {
    format!(
        "{REFRESH_COOKIE}={}; Max-Age={}; {}",
        refresh.value,
        refresh.max_age_seconds(),
        cookie_attributes(cookies, "Strict")
    )
}

pub fn clear_refresh_cookie(cookies: &CookieSettings) -> String {
    format!(
        "{REFRESH_COOKIE}=deleted; Max-Age=0; {}",
        cookie_attributes(cookies, "Strict")
    )
}

fn guest_cookie(identity: &Identity, cookies: &CookieSettings) -> String {
    let value = match identity {
        Identity::Guest { uuid } => uuid.as_str(),
        Identity::User { .. } => "",
    };
    format!(
        "{GUEST_COOKIE}={value}; Max-Age={}; {}",
        cookies.guest_max_age_seconds,
        cookie_attributes(cookies, "Lax")
    )
}

pub fn append_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid Set-Cookie value"),
    }
}
