//! In-process implementation of the link store.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::entities::{Identity, NewTinylink, Tinylink, TinylinkPatch};
use crate::domain::repositories::LinkStore;
use crate::error::AppError;

#[derive(Default)]
struct Links {
    next_id: i64,
    rows: BTreeMap<i64, Tinylink>,
}

impl Links {
    fn alias_taken(&self, new_link: &NewTinylink) -> bool {
        self.rows.values().any(|l| {
            l.alias == new_link.alias
                && l.private == new_link.private
                && (!l.private || l.owner == new_link.owner)
        })
    }
}

/// Link store held in process memory.
///
/// Applies the same constraints as the PostgreSQL schema under a single lock,
/// so it is a faithful stand-in for development and tests. Contents are lost on
/// restart.
#[derive(Default)]
pub struct MemoryLinkStore {
    inner: Mutex<Links>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn links(&self) -> MutexGuard<'_, Links> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn create(&self, new_link: NewTinylink) -> Result<Tinylink, AppError> {
        if new_link.private && !new_link.owner.is_user() {
            return Err(AppError::bad_request(
                "Private links require a user owner",
                json!({ "alias": new_link.alias }),
            ));
        }

        let mut links = self.links();
        links.next_id += 1;
        if links.alias_taken(&new_link) {
            return Err(AppError::alias_exists(
                "Alias is not available",
                json!({ "alias": new_link.alias }),
            ));
        }

        let now = Utc::now();
        let link = Tinylink {
            id: links.next_id,
            alias: new_link.alias,
            url: new_link.url,
            owner: new_link.owner,
            private: new_link.private,
            domain: new_link.domain,
            version: 1,
            usage_count: 0,
            created_at: now,
            updated_at: now,
            last_visited_at: None,
            expires_at: new_link.expires_at,
        };
        links.rows.insert(link.id, link.clone());

        Ok(link)
    }

    async fn find_public(&self, alias: &str) -> Result<Option<Tinylink>, AppError> {
        Ok(self
            .links()
            .rows
            .values()
            .find(|l| !l.private && l.alias == alias)
            .cloned())
    }

    async fn find_private(
        &self,
        owner_user_id: u64,
        alias: &str,
    ) -> Result<Option<Tinylink>, AppError> {
        Ok(self
            .links()
            .rows
            .values()
            .find(|l| l.private && l.alias == alias && l.owner.user_id() == Some(owner_user_id))
            .cloned())
    }

    async fn update(
        &self,
        owner: &Identity,
        id: i64,
        expected_version: i64,
        patch: TinylinkPatch,
    ) -> Result<Option<Tinylink>, AppError> {
        let mut links = self.links();
        let Some(link) = links
            .rows
            .get_mut(&id)
            .filter(|l| l.version == expected_version && l.is_owned_by(owner))
        else {
            return Ok(None);
        };

        if let Some(url) = patch.url {
            link.url = url;
        }
        if let Some(domain) = patch.domain {
            link.domain = domain;
        }
        if let Some(expires_at) = patch.expires_at {
            link.expires_at = expires_at;
        }
        link.version += 1;
        link.updated_at = Utc::now();

        Ok(Some(link.clone()))
    }

    async fn list_by_owner(&self, owner: &Identity) -> Result<Vec<Tinylink>, AppError> {
        Ok(self
            .links()
            .rows
            .values()
            .rev()
            .filter(|l| l.is_owned_by(owner))
            .cloned()
            .collect())
    }

    async fn delete(&self, owner: &Identity, alias: &str) -> Result<Vec<Tinylink>, AppError> {
        let mut links = self.links();
        let ids: Vec<i64> = links
            .rows
            .values()
            .filter(|l| l.alias == alias && l.is_owned_by(owner))
            .map(|l| l.id)
            .collect();

        Ok(ids
            .into_iter()
            .filter_map(|id| links.rows.remove(&id))
            .collect())
    }

    async fn record_visit(&self, id: i64) -> Result<(), AppError> {
        if let Some(link) = self.links().rows.get_mut(&id) {
            link.usage_count += 1;
            link.last_visited_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn alias_counter_floor(&self) -> Result<u64, AppError> {
        Ok(u64::try_from(self.links().next_id).unwrap_or(0))
    }

    async fn health_check(&self) -> bool {
        true
    }
}
