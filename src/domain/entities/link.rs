//! Tinylink entity and its creation/update inputs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::identity::Identity;

/// A short alias mapped to a target URL, owned by a user or a guest.
///
/// `owner` and `private` never change after creation. `version` is bumped by
/// every successful update; `usage_count` and `last_visited_at` are a
/// best-effort side channel and do not touch `version`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tinylink {
    pub id: i64,
    pub alias: String,
    pub url: String,
    pub owner: Identity,
    pub private: bool,
    pub domain: Option<String>,
    pub version: i64,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_visited_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Tinylink {
    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        &self.owner == identity
    }
}

/// Input data for inserting a new link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTinylink {
    pub alias: String,
    pub url: String,
    pub owner: Identity,
    pub private: bool,
    pub domain: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial update for an existing link.
///
/// `None` fields are left unchanged. For the double options, `Some(None)`
/// clears the value and `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TinylinkPatch {
    pub url: Option<String>,
    pub domain: Option<Option<String>>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl TinylinkPatch {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.domain.is_none() && self.expires_at.is_none()
    }
}

#[cfg(test)]
pub(crate) fn sample_link(id: i64, alias: &str, owner: Identity, private: bool) -> Tinylink {
    let now = Utc::now();
    Tinylink {
        id,
        alias: alias.to_string(),
        url: "https://example.org".to_string(),
        owner,
        private,
        domain: None,
        version: 1,
        usage_count: 0,
        created_at: now,
        updated_at: now,
        last_visited_at: None,
        expires_at: None,
    }
}
