//! Authoritative link storage contract.

use crate::domain::entities::{Identity, NewTinylink, Tinylink, TinylinkPatch};
use crate::error::AppError;
use async_trait::async_trait;

/// Authoritative store for tinylinks.
///
/// Alias uniqueness is enforced here, not by callers: public aliases share one
/// global namespace, private aliases are unique per owning user.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkStore`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryLinkStore`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Inserts a new link and returns it with its assigned id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AliasExists`] if the alias is taken in its namespace.
    async fn create(&self, new_link: NewTinylink) -> Result<Tinylink, AppError>;

    /// Finds a non-private link by alias.
    async fn find_public(&self, alias: &str) -> Result<Option<Tinylink>, AppError>;

    /// Finds a private link by alias among the links owned by `owner_user_id`.
    async fn find_private(
        &self,
        owner_user_id: u64,
        alias: &str,
    ) -> Result<Option<Tinylink>, AppError>;

    /// Applies `patch` when both owner and version match.
    ///
    /// Returns `Ok(None)` when no row matches; the stored record is unchanged.
    /// On success `version` is incremented and `updated_at` bumped.
    async fn update(
        &self,
        owner: &Identity,
        id: i64,
        expected_version: i64,
        patch: TinylinkPatch,
    ) -> Result<Option<Tinylink>, AppError>;

    /// Lists every link owned by `owner`, newest first.
    async fn list_by_owner(&self, owner: &Identity) -> Result<Vec<Tinylink>, AppError>;

    /// Deletes the owner's links with this alias and returns the removed rows.
    async fn delete(&self, owner: &Identity, alias: &str) -> Result<Vec<Tinylink>, AppError>;

    /// Increments the usage counter and stamps `last_visited_at`.
    async fn record_visit(&self, id: i64) -> Result<(), AppError>;

    /// Lowest safe starting point for the alias counter.
    ///
    /// Every insert attempt consumes an id, and every counter draw is followed
    /// by one insert attempt, so no counter value above this floor was ever
    /// issued.
    async fn alias_counter_floor(&self) -> Result<u64, AppError>;

    /// Checks that the backing store answers.
    async fn health_check(&self) -> bool;
}
