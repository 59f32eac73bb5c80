//! Refresh credential lifecycle: issue, rotate, revoke.

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;

use crate::domain::entities::{Identity, RefreshCredential};
use crate::domain::repositories::TokenStore;
use crate::error::AppError;
use crate::utils::timeout::with_timeout;

type HmacSha256 = Hmac<Sha256>;

/// Length of a raw refresh credential.
pub const REFRESH_VALUE_LEN: usize = 48;

/// Service for refresh credentials.
///
/// Raw values are handed out once and hashed with HMAC-SHA256 (keyed by
/// `signing_secret`) before they reach the store. A leaked `refresh_tokens`
/// table is useless without the server-side secret.
pub struct TokenService<T: TokenStore + ?Sized> {
    store: Arc<T>,
    signing_secret: String,
    refresh_ttl: Duration,
    store_timeout: std::time::Duration,
}

impl<T: TokenStore + ?Sized> TokenService<T> {
    pub fn new(
        store: Arc<T>,
        signing_secret: String,
        refresh_ttl: Duration,
        store_timeout: std::time::Duration,
    ) -> Self {
        Self {
            store,
            signing_secret,
            refresh_ttl,
            store_timeout,
        }
    }

    /// Hashes a raw credential into the 64-character hex form kept at rest.
    pub fn hash_token(&self, value: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|e| AppError::internal("Invalid signing key", json!({ "reason": e.to_string() })))?;
        mac.update(value.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn generate_value() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(REFRESH_VALUE_LEN)
            .map(char::from)
            .collect()
    }

    /// Issues a new refresh credential for `owner`, replacing any previous one.
    pub async fn issue(&self, owner: &Identity) -> Result<RefreshCredential, AppError> {
        let value = Self::generate_value();
        let expires_at = Utc::now() + self.refresh_ttl;
        let token_hash = self.hash_token(&value)?;

        with_timeout(
            self.store_timeout,
            "token_store.put",
            self.store.put(owner, &token_hash, expires_at),
        )
        .await?;

        Ok(RefreshCredential { value, expires_at })
    }

    /// Exchanges `presented` for a new credential.
    ///
    /// Succeeds at most once per presented value.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::TokenNotValid`] when `presented` is not the owner's
    /// current unexpired credential (mismatch, replay, expiry or no state), and
    /// [`AppError::Transient`] when the store cannot answer in time.
    pub async fn rotate(
        &self,
        owner: &Identity,
        presented: &str,
    ) -> Result<RefreshCredential, AppError> {
        let old_hash = self.hash_token(presented)?;
        let value = Self::generate_value();
        let new_hash = self.hash_token(&value)?;
        let expires_at = Utc::now() + self.refresh_ttl;

        let state = with_timeout(
            self.store_timeout,
            "token_store.compare_and_rotate",
            self.store
                .compare_and_rotate(owner, &old_hash, &new_hash, expires_at),
        )
        .await?;

        Ok(RefreshCredential {
            value,
            expires_at: state.expires_at,
        })
    }

    pub async fn revoke(&self, owner: &Identity) -> Result<(), AppError> {
        with_timeout(
            self.store_timeout,
            "token_store.revoke",
            self.store.revoke(owner),
        )
        .await
    }

    /// Remaining lifetime of the owner's refresh credential, `None` when the
    /// owner has no live credential.
    pub async fn remaining_ttl(&self, owner: &Identity) -> Result<Option<std::time::Duration>, AppError> {
        let state = with_timeout(self.store_timeout, "token_store.get", self.store.get(owner)).await?;

        Ok(state
            .and_then(|s| s.remaining_at(Utc::now()))
            .and_then(|d| d.to_std().ok()))
    }
}
