//! Refresh credential storage contract.

use crate::domain::entities::{Identity, RefreshState};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable refresh credential state, one entry per owner identity.
///
/// Values are HMAC hashes produced by
/// [`crate::application::services::TokenService`]; raw credentials never reach
/// the store.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgTokenStore`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryTokenStore`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the owner's current state, if any. Expired state is returned as-is.
    async fn get(&self, owner: &Identity) -> Result<Option<RefreshState>, AppError>;

    /// Stores (or replaces) the owner's state. Used at login.
    async fn put(
        &self,
        owner: &Identity,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Atomically swaps `old_hash` for `new_hash` if, and only if, it is the
    /// owner's current unexpired value.
    ///
    /// Of several concurrent calls presenting the same `old_hash`, exactly one
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::TokenNotValid`] on mismatch, expiry or missing state.
    async fn compare_and_rotate(
        &self,
        owner: &Identity,
        old_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshState, AppError>;

    /// Removes the owner's state. Revoking an absent owner is not an error.
    async fn revoke(&self, owner: &Identity) -> Result<(), AppError>;
}
