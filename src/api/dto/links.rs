//! DTOs for link management endpoints.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::sync::LazyLock;
use validator::Validate;

use crate::application::services::NewLinkRequest;
use crate::domain::entities::{Tinylink, TinylinkPatch};

static ALIAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,64}$").expect("alias regex is valid"));

/// Request body for `POST /api/links`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,

    /// Custom alias. Omitted or empty means a generated one.
    #[validate(regex(path = *ALIAS_REGEX, message = "Alias must be 3-64 of [A-Za-z0-9_-]"))]
    pub alias: Option<String>,

    /// Reachable only through `/p/{alias}` by its owner. Users only.
    #[serde(default)]
    pub private: bool,

    #[validate(length(max = 255))]
    pub domain: Option<String>,

    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateLinkRequest {
    /// Drops an empty alias so it is validated and handled as absent.
    pub fn normalized(mut self) -> Self {
        self.alias = self.alias.filter(|a| !a.is_empty());
        self
    }
}

impl From<CreateLinkRequest> for NewLinkRequest {
    fn from(req: CreateLinkRequest) -> Self {
        Self {
            url: req.url,
            alias: req.alias,
            private: req.private,
            domain: req.domain,
            expires_at: req.expires_at,
        }
    }
}

/// Request body for `PATCH /api/links/{id}`.
///
/// `version` must match the stored one. For `domain` and `expires_at`, an
/// absent field is left unchanged, `null` clears it and a value sets it.
#[serde_as]
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    pub version: i64,

    #[validate(url(message = "Invalid URL format"))]
    pub url: Option<String>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub domain: Option<Option<String>>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateLinkRequest {
    pub fn into_patch(self) -> (i64, TinylinkPatch) {
        (
            self.version,
            TinylinkPatch {
                url: self.url,
                domain: self.domain,
                expires_at: self.expires_at,
            },
        )
    }
}

/// JSON representation of a link.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub id: i64,
    pub alias: String,
    pub url: String,
    /// Redirect path: `/{alias}` or `/p/{alias}` for private links.
    pub path: String,
    pub private: bool,
    pub domain: Option<String>,
    pub version: i64,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_visited_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Tinylink> for LinkResponse {
    fn from(link: Tinylink) -> Self {
        let path = if link.private {
            format!("/p/{}", link.alias)
        } else {
            format!("/{}", link.alias)
        };

        Self {
            id: link.id,
            alias: link.alias,
            url: link.url,
            path,
            private: link.private,
            domain: link.domain,
            version: link.version,
            usage_count: link.usage_count,
            created_at: link.created_at,
            updated_at: link.updated_at,
            last_visited_at: link.last_visited_at,
            expires_at: link.expires_at,
        }
    }
}

/// Response for `GET /api/links`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkListResponse {
    pub total: usize,
    pub items: Vec<LinkResponse>,
}
