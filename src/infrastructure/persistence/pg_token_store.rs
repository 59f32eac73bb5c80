//! PostgreSQL implementation of the refresh token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Identity, RefreshState};
use crate::domain::repositories::TokenStore;
use crate::error::AppError;

/// PostgreSQL store for refresh credential hashes, one row per owner.
///
/// Rotation is a single conditional `UPDATE`: under concurrent attempts with
/// the same presented hash, the first commit changes `token_hash` and the
/// others re-evaluate the `WHERE` clause against the new row and match nothing.
pub struct PgTokenStore {
    pool: Arc<PgPool>,
}

impl PgTokenStore {
    /// Creates a new store with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshRow {
    token_hash: String,
    expires_at: DateTime<Utc>,
}

impl From<RefreshRow> for RefreshState {
    fn from(row: RefreshRow) -> Self {
        Self {
            token_hash: row.token_hash,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn get(&self, owner: &Identity) -> Result<Option<RefreshState>, AppError> {
        let row = sqlx::query_as::<_, RefreshRow>(
            r#"
            SELECT token_hash, expires_at
            FROM refresh_tokens
            WHERE owner = $1
            "#,
        )
        .bind(owner.to_string())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(RefreshState::from))
    }

    async fn put(
        &self,
        owner: &Identity,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (owner, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (owner) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW(),
                rotated_at = NULL
            "#,
        )
        .bind(owner.to_string())
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn compare_and_rotate(
        &self,
        owner: &Identity,
        old_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshState, AppError> {
        let row = sqlx::query_as::<_, RefreshRow>(
            r#"
            UPDATE refresh_tokens
            SET token_hash = $3,
                expires_at = $4,
                rotated_at = NOW()
            WHERE owner = $1
              AND token_hash = $2
              AND expires_at > NOW()
            RETURNING token_hash, expires_at
            "#,
        )
        .bind(owner.to_string())
        .bind(old_hash)
        .bind(new_hash)
        .bind(expires_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(RefreshState::from).ok_or_else(|| {
            AppError::token_not_valid(
                "Refresh token is not valid",
                json!({ "owner": owner.to_string() }),
            )
        })
    }

    async fn revoke(&self, owner: &Identity) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE owner = $1")
            .bind(owner.to_string())
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}
