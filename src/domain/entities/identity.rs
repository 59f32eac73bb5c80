//! Caller identity: an authenticated user or an anonymous guest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The identity a request acts as.
///
/// Exactly one variant is active per request. Users are durable and come from a
/// login exchange; guests are minted on first contact and persisted in a cookie.
///
/// The textual form (`user:<id>` / `guest:<uuid>`) is the owner key used for
/// refresh credential state and the `sub` claim of access credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    User { id: u64 },
    Guest { uuid: String },
}

/// Error returned when parsing an [`Identity`] from its textual form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identity: {0}")]
pub struct ParseIdentityError(String);

impl Identity {
    pub fn user(id: u64) -> Self {
        Self::User { id }
    }

    /// Mints a fresh guest identity.
    pub fn new_guest() -> Self {
        Self::Guest {
            uuid: Uuid::new_v4().to_string(),
        }
    }

    /// Builds a guest identity from a cookie value, rejecting anything that is
    /// not a well-formed UUID.
    pub fn guest_from_cookie(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(|u| Self::Guest {
            uuid: u.to_string(),
        })
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    pub fn user_id(&self) -> Option<u64> {
        match self {
            Self::User { id } => Some(*id),
            Self::Guest { .. } => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { id } => write!(f, "user:{id}"),
            Self::Guest { uuid } => write!(f, "guest:{uuid}"),
        }
    }
}

impl FromStr for Identity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("user", id)) => id
                .parse::<u64>()
                .map(Self::user)
                .map_err(|_| ParseIdentityError(s.to_string())),
            Some(("guest", uuid)) => {
                Self::guest_from_cookie(uuid).ok_or_else(|| ParseIdentityError(s.to_string()))
            }
            _ => Err(ParseIdentityError(s.to_string())),
        }
    }
}
