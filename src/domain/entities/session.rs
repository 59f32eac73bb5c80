//! Refresh credential types.

use chrono::{DateTime, Duration, Utc};

/// Stored state of an owner's refresh credential.
///
/// Only the HMAC of the credential is kept; the raw value leaves the server
/// once, in a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshState {
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshState {
    /// Remaining lifetime at `now`, or `None` once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.expires_at - now;
        (remaining > Duration::zero()).then_some(remaining)
    }
}

/// A freshly issued refresh credential, returned to the caller exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCredential {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshCredential {
    /// Seconds until expiry, clamped at zero. Used as the cookie `Max-Age`.
    pub fn max_age_seconds(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}
