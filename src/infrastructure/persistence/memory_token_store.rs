//! In-process implementation of the refresh token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;

use crate::domain::entities::{Identity, RefreshState};
use crate::domain::repositories::TokenStore;
use crate::error::AppError;

/// Refresh token store held in process memory.
///
/// Compare-and-rotate runs while holding the shard lock of the owner's entry,
/// which makes it atomic with respect to other rotations for the same owner.
#[derive(Default)]
pub struct MemoryTokenStore {
    states: DashMap<Identity, RefreshState>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_valid(owner: &Identity) -> AppError {
    AppError::token_not_valid(
        "Refresh token is not valid",
        json!({ "owner": owner.to_string() }),
    )
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, owner: &Identity) -> Result<Option<RefreshState>, AppError> {
        Ok(self.states.get(owner).map(|s| s.value().clone()))
    }

    async fn put(
        &self,
        owner: &Identity,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.states.insert(
            owner.clone(),
            RefreshState {
                token_hash: token_hash.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn compare_and_rotate(
        &self,
        owner: &Identity,
        old_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshState, AppError> {
        let Entry::Occupied(mut entry) = self.states.entry(owner.clone()) else {
            return Err(not_valid(owner));
        };

        let current = entry.get();
        if current.token_hash != old_hash || current.expires_at <= Utc::now() {
            return Err(not_valid(owner));
        }

        let rotated = RefreshState {
            token_hash: new_hash.to_string(),
            expires_at,
        };
        entry.insert(rotated.clone());

        Ok(rotated)
    }

    async fn revoke(&self, owner: &Identity) -> Result<(), AppError> {
        self.states.remove(owner);
        Ok(())
    }
}
