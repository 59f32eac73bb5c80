//! PostgreSQL implementation of the link store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Identity, NewTinylink, Tinylink, TinylinkPatch};
use crate::domain::repositories::LinkStore;
use crate::error::AppError;

/// PostgreSQL store for tinylinks.
///
/// Alias scoping relies on two partial unique indexes (public aliases, and
/// `(owner_user_id, alias)` among private ones); a violation of either surfaces
/// as [`AppError::AliasExists`] through the `sqlx::Error` conversion.
pub struct PgLinkStore {
    pool: Arc<PgPool>,
}

impl PgLinkStore {
    /// Creates a new store with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

}

#[derive(sqlx::FromRow)]
struct TinylinkRow {
    id: i64,
    alias: String,
    url: String,
    owner_user_id: Option<i64>,
    owner_guest_id: Option<String>,
    private: bool,
    domain: Option<String>,
    version: i64,
    usage_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_visited_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<TinylinkRow> for Tinylink {
    type Error = AppError;

    fn try_from(row: TinylinkRow) -> Result<Self, Self::Error> {
        let owner = match (row.owner_user_id, row.owner_guest_id) {
            (Some(user_id), None) => Identity::User {
                id: u64::try_from(user_id).map_err(|_| corrupt_owner(row.id))?,
            },
            (None, Some(uuid)) => Identity::Guest { uuid },
            _ => return Err(corrupt_owner(row.id)),
        };

        Ok(Tinylink {
            id: row.id,
            alias: row.alias,
            url: row.url,
            owner,
            private: row.private,
            domain: row.domain,
            version: row.version,
            usage_count: row.usage_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_visited_at: row.last_visited_at,
            expires_at: row.expires_at,
        })
    }
}

fn corrupt_owner(id: i64) -> AppError {
    tracing::error!(link_id = id, "Tinylink row has an invalid owner");
    AppError::internal("Corrupt link owner", json!({ "id": id }))
}

/// Splits an identity into the `(owner_user_id, owner_guest_id)` column pair.
fn owner_columns(owner: &Identity) -> Result<(Option<i64>, Option<String>), AppError> {
    match owner {
        Identity::User { id } => {
            let id = i64::try_from(*id).map_err(|_| {
                AppError::bad_request("User id out of range", json!({ "user_id": id }))
            })?;
            Ok((Some(id), None))
        }
        Identity::Guest { uuid } => Ok((None, Some(uuid.clone()))),
    }
}

fn rows_to_links(rows: Vec<TinylinkRow>) -> Result<Vec<Tinylink>, AppError> {
    rows.into_iter().map(Tinylink::try_from).collect()
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn create(&self, new_link: NewTinylink) -> Result<Tinylink, AppError> {
        let (owner_user_id, owner_guest_id) = owner_columns(&new_link.owner)?;

        let row = sqlx::query_as::<_, TinylinkRow>(
            r#"
            INSERT INTO tinylinks (alias, url, owner_user_id, owner_guest_id, private, domain, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, alias, url, owner_user_id, owner_guest_id, private, domain,
                      version, usage_count, created_at, updated_at, last_visited_at, expires_at
            "#,
        )
        .bind(&new_link.alias)
        .bind(&new_link.url)
        .bind(owner_user_id)
        .bind(owner_guest_id)
        .bind(new_link.private)
        .bind(&new_link.domain)
        .bind(new_link.expires_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn find_public(&self, alias: &str) -> Result<Option<Tinylink>, AppError> {
        let row = sqlx::query_as::<_, TinylinkRow>(
            r#"
            SELECT id, alias, url, owner_user_id, owner_guest_id, private, domain,
                   version, usage_count, created_at, updated_at, last_visited_at, expires_at
            FROM tinylinks
            WHERE alias = $1 AND NOT private
            "#,
        )
        .bind(alias)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Tinylink::try_from).transpose()
    }

    async fn find_private(
        &self,
        owner_user_id: u64,
        alias: &str,
    ) -> Result<Option<Tinylink>, AppError> {
        let (owner_user_id, _) = owner_columns(&Identity::user(owner_user_id))?;

        let row = sqlx::query_as::<_, TinylinkRow>(
            r#"
            SELECT id, alias, url, owner_user_id, owner_guest_id, private, domain,
                   version, usage_count, created_at, updated_at, last_visited_at, expires_at
            FROM tinylinks
            WHERE alias = $1 AND private AND owner_user_id = $2
            "#,
        )
        .bind(alias)
        .bind(owner_user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Tinylink::try_from).transpose()
    }

    async fn update(
        &self,
        owner: &Identity,
        id: i64,
        expected_version: i64,
        patch: TinylinkPatch,
    ) -> Result<Option<Tinylink>, AppError> {
        let (owner_user_id, owner_guest_id) = owner_columns(owner)?;
        let set_domain = patch.domain.is_some();
        let set_expires_at = patch.expires_at.is_some();

        let row = sqlx::query_as::<_, TinylinkRow>(
            r#"
            UPDATE tinylinks
            SET url        = COALESCE($5, url),
                domain     = CASE WHEN $6 THEN $7 ELSE domain END,
                expires_at = CASE WHEN $8 THEN $9 ELSE expires_at END,
                version    = version + 1,
                updated_at = NOW()
            WHERE id = $1
              AND version = $2
              AND (owner_user_id = $3 OR owner_guest_id = $4)
            RETURNING id, alias, url, owner_user_id, owner_guest_id, private, domain,
                      version, usage_count, created_at, updated_at, last_visited_at, expires_at
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(owner_user_id)
        .bind(owner_guest_id)
        .bind(patch.url)
        .bind(set_domain)
        .bind(patch.domain.flatten())
        .bind(set_expires_at)
        .bind(patch.expires_at.flatten())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Tinylink::try_from).transpose()
    }

    async fn list_by_owner(&self, owner: &Identity) -> Result<Vec<Tinylink>, AppError> {
        let (owner_user_id, owner_guest_id) = owner_columns(owner)?;

        let rows = sqlx::query_as::<_, TinylinkRow>(
            r#"
            SELECT id, alias, url, owner_user_id, owner_guest_id, private, domain,
                   version, usage_count, created_at, updated_at, last_visited_at, expires_at
            FROM tinylinks
            WHERE owner_user_id = $1 OR owner_guest_id = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_user_id)
        .bind(owner_guest_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows_to_links(rows)
    }

    async fn delete(&self, owner: &Identity, alias: &str) -> Result<Vec<Tinylink>, AppError> {
        let (owner_user_id, owner_guest_id) = owner_columns(owner)?;

        let rows = sqlx::query_as::<_, TinylinkRow>(
            r#"
            DELETE FROM tinylinks
            WHERE alias = $1
              AND (owner_user_id = $2 OR owner_guest_id = $3)
            RETURNING id, alias, url, owner_user_id, owner_guest_id, private, domain,
                      version, usage_count, created_at, updated_at, last_visited_at, expires_at
            "#,
        )
        .bind(alias)
        .bind(owner_user_id)
        .bind(owner_guest_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows_to_links(rows)
    }

    async fn record_visit(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE tinylinks
            SET usage_count = usage_count + 1,
                last_visited_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    /// Last value handed out by the row id sequence. A failed insert still
    /// consumes its value.
    async fn alias_counter_floor(&self) -> Result<u64, AppError> {
        let last: i64 = sqlx::query_scalar("SELECT last_value FROM tinylinks_id_seq")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(u64::try_from(last).unwrap_or(0))
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
