//! Tinylink creation, update, redirect resolution, listing and deletion.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::application::services::token_service::TokenService;
use crate::domain::entities::{Identity, NewTinylink, Tinylink, TinylinkPatch};
use crate::domain::repositories::{LinkStore, TokenStore};
use crate::domain::visit_event::VisitEvent;
use crate::error::AppError;
use crate::infrastructure::cache::{LinkCache, RedirectCacheEntry};
use crate::utils::alias_codec::{encode, is_reserved, validate_custom_alias};
use crate::utils::target_url::normalize_target_url;
use crate::utils::timeout::with_timeout;

/// Cache key of the alias counter.
pub const ALIAS_COUNTER_KEY: &str = "alias_counter";

/// Counter values tried before giving up on a generated alias.
const MAX_GENERATION_ATTEMPTS: usize = 10;

/// Which namespace a redirect resolves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectRoute {
    Public,
    Private,
}

/// Where a redirect points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub row_id: i64,
    pub url: String,
}

/// Input for [`LinkService::create`].
#[derive(Debug, Clone, Default)]
pub struct NewLinkRequest {
    pub url: String,
    pub alias: Option<String>,
    pub private: bool,
    pub domain: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub struct LinkSettings {
    /// Cache lifetime of entries for guest-owned links.
    pub guest_cache_ttl: Duration,
    /// Deadline for every store and cache call.
    pub store_timeout: Duration,
}

/// Health of the link pipeline's dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHealth {
    pub store: bool,
    pub cache: bool,
    pub visit_queue: bool,
}

impl LinkHealth {
    pub fn is_healthy(&self) -> bool {
        self.store && self.cache && self.visit_queue
    }
}

/// Service for managing tinylinks and resolving redirects.
///
/// Redirects are cache-aside: the cache is consulted first and populated from
/// the store on a miss. Usage accounting happens only on store hits and is
/// handed to the visit worker without waiting.
pub struct LinkService<S: LinkStore + ?Sized, T: TokenStore + ?Sized> {
    store: Arc<S>,
    cache: Arc<dyn LinkCache>,
    tokens: Arc<TokenService<T>>,
    visits: mpsc::Sender<VisitEvent>,
    settings: LinkSettings,
}

impl<S: LinkStore + ?Sized, T: TokenStore + ?Sized> LinkService<S, T> {
    pub fn new(
        store: Arc<S>,
        cache: Arc<dyn LinkCache>,
        tokens: Arc<TokenService<T>>,
        visits: mpsc::Sender<VisitEvent>,
        settings: LinkSettings,
    ) -> Self {
        Self {
            store,
            cache,
            tokens,
            visits,
            settings,
        }
    }

    /// Creates a link owned by `owner`.
    ///
    /// # Errors
    ///
    /// - [`AppError::Unauthenticated`] for a private link requested by a guest
    /// - [`AppError::Validation`] for a bad URL, custom alias or past expiry
    /// - [`AppError::AliasExists`] if the custom alias is taken in its namespace
    /// - [`AppError::Internal`] if no free generated alias was found
    pub async fn create(&self, owner: &Identity, request: NewLinkRequest) -> Result<Tinylink, AppError> {
        if request.private && !owner.is_user() {
            return Err(AppError::unauthenticated(
                "Private links require a signed-in user",
                json!({}),
            ));
        }

        let url = normalize_target_url(&request.url).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        if let Some(expires_at) = request.expires_at
            && expires_at <= Utc::now()
        {
            return Err(AppError::bad_request(
                "Expiry must be in the future",
                json!({ "expires_at": expires_at }),
            ));
        }

        let custom_alias = request.alias.filter(|a| !a.trim().is_empty());
        let mut new_link = NewTinylink {
            alias: String::new(),
            url,
            owner: owner.clone(),
            private: request.private,
            domain: request.domain,
            expires_at: request.expires_at,
        };

        if let Some(alias) = custom_alias {
            validate_custom_alias(&alias)?;
            new_link.alias = alias;
            return self.insert(new_link).await;
        }

        self.create_with_generated_alias(new_link).await
    }

    async fn insert(&self, new_link: NewTinylink) -> Result<Tinylink, AppError> {
        let link = with_timeout(
            self.settings.store_timeout,
            "link_store.create",
            self.store.create(new_link),
        )
        .await?;

        tracing::info!(link_id = link.id, alias = %link.alias, owner = %link.owner, "Link created");
        Ok(link)
    }

    /// Draws counter values until the store accepts one.
    ///
    /// A collision only happens when a custom alias already took the encoded
    /// value, so the next counter value is tried. Encodings that name a
    /// service route are skipped.
    async fn create_with_generated_alias(&self, new_link: NewTinylink) -> Result<Tinylink, AppError> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let n = with_timeout(self.settings.store_timeout, "cache.atomic_increment", async {
                self.cache
                    .atomic_increment(ALIAS_COUNTER_KEY)
                    .await
                    .map_err(AppError::from)
            })
            .await?;

            let alias = encode(n);
            if is_reserved(&alias) {
                tracing::debug!(counter = n, alias = %alias, "Generated alias is reserved, drawing next");
                continue;
            }

            let candidate = NewTinylink {
                alias,
                ..new_link.clone()
            };

            match self.insert(candidate).await {
                Err(AppError::AliasExists { .. }) => {
                    tracing::debug!(counter = n, "Generated alias taken, drawing next");
                }
                result => return result,
            }
        }

        Err(AppError::internal(
            "Failed to generate unique alias",
            json!({ "reason": "Too many collisions" }),
        ))
    }

    /// Raises the alias counter to the store's floor.
    ///
    /// Run at startup, so a counter that was lost or reset never reissues an
    /// alias the store already holds. Returns the floor.
    pub async fn seed_alias_counter(&self) -> Result<u64, AppError> {
        let floor = with_timeout(
            self.settings.store_timeout,
            "link_store.alias_counter_floor",
            self.store.alias_counter_floor(),
        )
        .await?;

        with_timeout(self.settings.store_timeout, "cache.seed_counter", async {
            self.cache
                .seed_counter(ALIAS_COUNTER_KEY, floor)
                .await
                .map_err(AppError::from)
        })
        .await?;

        tracing::info!(floor, "Alias counter seeded");
        Ok(floor)
    }

    /// Applies `patch` to the owner's link `id` at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link does not exist, belongs to
    /// someone else, or `version` is stale. The record is left untouched.
    pub async fn update(
        &self,
        owner: &Identity,
        id: i64,
        version: i64,
        mut patch: TinylinkPatch,
    ) -> Result<Tinylink, AppError> {
        if patch.is_empty() {
            return Err(AppError::bad_request("Nothing to update", json!({ "id": id })));
        }

        if let Some(url) = patch.url.take() {
            let normalized = normalize_target_url(&url).map_err(|e| {
                AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
            })?;
            patch.url = Some(normalized);
        }

        let updated = with_timeout(
            self.settings.store_timeout,
            "link_store.update",
            self.store.update(owner, id, version, patch),
        )
        .await?
        .ok_or_else(|| {
            AppError::not_found(
                "Link not found or version is stale",
                json!({ "id": id, "version": version }),
            )
        })?;

        self.evict(&RedirectCacheEntry::key_for(&updated)).await;
        tracing::info!(link_id = id, version = updated.version, "Link updated");

        Ok(updated)
    }

    /// Resolves `alias` to its target.
    ///
    /// # Errors
    ///
    /// - [`AppError::Unauthenticated`] on the private route without a user caller
    /// - [`AppError::NotFound`] when the alias is unknown, expired or (on the
    ///   private route) owned by someone else
    /// - [`AppError::Transient`] when the store cannot answer
    pub async fn redirect(
        &self,
        caller: Option<&Identity>,
        alias: &str,
        route: RedirectRoute,
    ) -> Result<RedirectTarget, AppError> {
        let private_owner = match route {
            RedirectRoute::Public => None,
            RedirectRoute::Private => Some(caller.and_then(Identity::user_id).ok_or_else(|| {
                AppError::unauthenticated("Private links require a signed-in user", json!({}))
            })?),
        };

        let key = match private_owner {
            Some(user_id) => RedirectCacheEntry::private_key(user_id, alias),
            None => RedirectCacheEntry::public_key(alias),
        };

        if let Some(hit) = self.cached(&key).await {
            metrics::counter!("tinylink_redirects_total", "tier" => "cache").increment(1);
            return Ok(RedirectTarget {
                row_id: hit.row_id,
                url: hit.url,
            });
        }

        let found = match private_owner {
            Some(user_id) => {
                with_timeout(
                    self.settings.store_timeout,
                    "link_store.find_private",
                    self.store.find_private(user_id, alias),
                )
                .await?
            }
            None => {
                with_timeout(
                    self.settings.store_timeout,
                    "link_store.find_public",
                    self.store.find_public(alias),
                )
                .await?
            }
        };

        let link = found.filter(|l| !l.is_expired()).ok_or_else(|| {
            AppError::not_found("Short link not found", json!({ "alias": alias }))
        })?;

        self.populate(&key, &link).await;
        self.enqueue_visit(link.id);
        metrics::counter!("tinylink_redirects_total", "tier" => "store").increment(1);

        Ok(RedirectTarget {
            row_id: link.id,
            url: link.url,
        })
    }

    /// Lists the links owned by `owner`, newest first.
    pub async fn list(&self, owner: &Identity) -> Result<Vec<Tinylink>, AppError> {
        with_timeout(
            self.settings.store_timeout,
            "link_store.list_by_owner",
            self.store.list_by_owner(owner),
        )
        .await
    }

    /// Deletes the owner's links with `alias` and evicts their cache entries.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when the owner has no link with `alias`.
    pub async fn delete(&self, owner: &Identity, alias: &str) -> Result<Vec<Tinylink>, AppError> {
        let removed = with_timeout(
            self.settings.store_timeout,
            "link_store.delete",
            self.store.delete(owner, alias),
        )
        .await?;

        if removed.is_empty() {
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "alias": alias }),
            ));
        }

        for link in &removed {
            self.evict(&RedirectCacheEntry::key_for(link)).await;
        }
        tracing::info!(alias, owner = %owner, removed = removed.len(), "Links deleted");

        Ok(removed)
    }

    pub async fn health(&self) -> LinkHealth {
        let (store, cache) = tokio::join!(self.store.health_check(), self.cache.health_check());
        LinkHealth {
            store,
            cache,
            visit_queue: !self.visits.is_closed(),
        }
    }

    async fn cached(&self, key: &str) -> Option<RedirectCacheEntry> {
        let result = with_timeout(self.settings.store_timeout, "cache.get", async {
            self.cache.get(key).await.map_err(AppError::from)
        })
        .await;

        match result {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    /// Cache lifetime for `link`, `None` when it must not be cached.
    ///
    /// User-owned entries live no longer than the owner's refresh credential,
    /// guest-owned entries use the configured TTL. Both are capped by the
    /// link's own expiry.
    async fn cache_ttl(&self, link: &Tinylink) -> Option<Duration> {
        let base = match &link.owner {
            Identity::Guest { .. } => self.settings.guest_cache_ttl,
            owner @ Identity::User { .. } => match self.tokens.remaining_ttl(owner).await {
                Ok(remaining) => remaining?,
                Err(e) => {
                    tracing::warn!(owner = %owner, error = %e, "Cannot read owner session, not caching");
                    return None;
                }
            },
        };

        let ttl = match link.expires_at {
            Some(expires_at) => base.min((expires_at - Utc::now()).to_std().ok()?),
            None => base,
        };

        (!ttl.is_zero()).then_some(ttl)
    }

    async fn populate(&self, key: &str, link: &Tinylink) {
        let Some(ttl) = self.cache_ttl(link).await else {
            tracing::debug!(link_id = link.id, "Link not cached");
            return;
        };

        let entry = RedirectCacheEntry::from(link);
        let result = with_timeout(self.settings.store_timeout, "cache.set", async {
            self.cache.set(key, &entry, ttl).await.map_err(AppError::from)
        })
        .await;

        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    async fn evict(&self, key: &str) {
        let result = with_timeout(self.settings.store_timeout, "cache.evict", async {
            self.cache.evict(key).await.map_err(AppError::from)
        })
        .await;

        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Cache eviction failed");
        }
    }

    fn enqueue_visit(&self, link_id: i64) {
        match self.visits.try_send(VisitEvent::new(link_id)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                metrics::counter!("tinylink_visits_dropped_total").increment(1);
                tracing::debug!(link_id, "Visit queue full, dropping visit");
            }
            Err(TrySendError::Closed(_)) => {
                metrics::counter!("tinylink_visits_dropped_total").increment(1);
                tracing::warn!(link_id, "Visit queue closed, dropping visit");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::link::sample_link;
    use crate::domain::repositories::{MockLinkStore, MockTokenStore};
    use crate::infrastructure::cache::MemoryCache;
    use crate::infrastructure::persistence::{MemoryLinkStore, MemoryTokenStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness<S: LinkStore + ?Sized, T: TokenStore + ?Sized> {
        service: LinkService<S, T>,
        cache: Arc<MemoryCache>,
        tokens: Arc<TokenService<T>>,
        visits: mpsc::Receiver<VisitEvent>,
    }

    fn harness<S, T>(store: Arc<S>, token_store: Arc<T>) -> Harness<S, T>
    where
        S: LinkStore + ?Sized,
        T: TokenStore + ?Sized,
    {
        let cache = Arc::new(MemoryCache::new());
        let tokens = Arc::new(TokenService::new(
            token_store,
            "test-signing-secret-test-signing-secret".to_string(),
            chrono::Duration::days(7),
            Duration::from_secs(1),
        ));
        let (tx, rx) = mpsc::channel(16);
        let service = LinkService::new(
            store,
            cache.clone(),
            tokens.clone(),
            tx,
            LinkSettings {
                guest_cache_ttl: Duration::from_secs(3600),
                store_timeout: Duration::from_secs(1),
            },
        );

        Harness {
            service,
            cache,
            tokens,
            visits: rx,
        }
    }

    fn memory_harness() -> Harness<MemoryLinkStore, MemoryTokenStore> {
        harness(
            Arc::new(MemoryLinkStore::new()),
            Arc::new(MemoryTokenStore::new()),
        )
    }

    fn request(url: &str, alias: Option<&str>, private: bool) -> NewLinkRequest {
        NewLinkRequest {
            url: url.to_string(),
            alias: alias.map(str::to_string),
            private,
            ..Default::default()
        }
    }

    /// Counts lookups so tests can tell a cache hit from a store hit.
    struct CountingStore {
        inner: MemoryLinkStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl LinkStore for CountingStore {
        async fn create(&self, new_link: NewTinylink) -> Result<Tinylink, AppError> {
            self.inner.create(new_link).await
        }
        async fn find_public(&self, alias: &str) -> Result<Option<Tinylink>, AppError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_public(alias).await
        }
        async fn find_private(&self, owner: u64, alias: &str) -> Result<Option<Tinylink>, AppError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_private(owner, alias).await
        }
        async fn update(
            &self,
            owner: &Identity,
            id: i64,
            version: i64,
            patch: TinylinkPatch,
        ) -> Result<Option<Tinylink>, AppError> {
            self.inner.update(owner, id, version, patch).await
        }
        async fn list_by_owner(&self, owner: &Identity) -> Result<Vec<Tinylink>, AppError> {
            self.inner.list_by_owner(owner).await
        }
        async fn delete(&self, owner: &Identity, alias: &str) -> Result<Vec<Tinylink>, AppError> {
            self.inner.delete(owner, alias).await
        }
        async fn record_visit(&self, id: i64) -> Result<(), AppError> {
            self.inner.record_visit(id).await
        }
        async fn alias_counter_floor(&self) -> Result<u64, AppError> {
            self.inner.alias_counter_floor().await
        }
        async fn health_check(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_guest_creates_public_link_and_redirects() {
        let mut h = memory_harness();
        let guest = Identity::new_guest();

        let link = h
            .service
            .create(&guest, request("https://example.org/page", None, false))
            .await
            .unwrap();
        assert_eq!(link.alias, "1");

        let target = h
            .service
            .redirect(None, &link.alias, RedirectRoute::Public)
            .await
            .unwrap();
        assert_eq!(target.url, "https://example.org/page");
        assert_eq!(target.row_id, link.id);
        assert_eq!(h.visits.try_recv().unwrap().link_id, link.id);
    }

    #[tokio::test]
    async fn test_generated_aliases_follow_counter() {
        let h = memory_harness();
        let guest = Identity::new_guest();

        let mut aliases = Vec::new();
        for _ in 0..3 {
            let link = h
                .service
                .create(&guest, request("https://example.org", Some(""), false))
                .await
                .unwrap();
            aliases.push(link.alias);
        }

        assert_eq!(aliases, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_reset_counter_is_reseeded_from_store() {
        let store = Arc::new(MemoryLinkStore::new());
        let tokens = Arc::new(MemoryTokenStore::new());
        let guest = Identity::new_guest();

        let before = harness(store.clone(), tokens.clone());
        for _ in 0..20 {
            before
                .service
                .create(&guest, request("https://example.org", None, false))
                .await
                .unwrap();
        }

        // a fresh cache over the same store, as after a Redis flush
        let after = harness(store, tokens);
        assert_eq!(after.service.seed_alias_counter().await.unwrap(), 20);

        let link = after
            .service
            .create(&guest, request("https://example.org", None, false))
            .await
            .unwrap();
        assert_eq!(link.alias, encode(21));
    }

    #[tokio::test]
    async fn test_seeding_never_lowers_the_counter() {
        let h = memory_harness();
        h.cache.seed_counter(ALIAS_COUNTER_KEY, 40).await.unwrap();

        assert_eq!(h.service.seed_alias_counter().await.unwrap(), 0);
        let link = h
            .service
            .create(&Identity::new_guest(), request("https://example.org", None, false))
            .await
            .unwrap();
        assert_eq!(link.alias, encode(41));
    }

    #[tokio::test]
    async fn test_generation_skips_reserved_aliases() {
        let h = memory_harness();
        h.cache.seed_counter(ALIAS_COUNTER_KEY, 50).await.unwrap();

        let link = h
            .service
            .create(&Identity::new_guest(), request("https://example.org", None, false))
            .await
            .unwrap();

        assert_eq!(encode(51), "p");
        assert_eq!(link.alias, encode(52));
        assert!(h.service.redirect(None, "p", RedirectRoute::Public).await.is_err());
    }

    #[tokio::test]
    async fn test_generation_retries_on_collision() {
        let mut mock_store = MockLinkStore::new();
        let mut seq = mockall::Sequence::new();
        mock_store
            .expect_create()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|l| Err(AppError::alias_exists("taken", json!({ "alias": l.alias }))));
        mock_store
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|l| Ok(sample_link(9, &l.alias, l.owner, l.private)));

        let h = harness(Arc::new(mock_store), Arc::new(MockTokenStore::new()));
        let link = h
            .service
            .create(&Identity::new_guest(), request("https://example.org", None, false))
            .await
            .unwrap();

        assert_eq!(link.alias, "3");
    }

    #[tokio::test]
    async fn test_generation_gives_up() {
        let mut mock_store = MockLinkStore::new();
        mock_store
            .expect_create()
            .times(MAX_GENERATION_ATTEMPTS)
            .returning(|_| Err(AppError::alias_exists("taken", json!({}))));

        let h = harness(Arc::new(mock_store), Arc::new(MockTokenStore::new()));
        let err = h
            .service
            .create(&Identity::new_guest(), request("https://example.org", None, false))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_guest_cannot_create_private() {
        let h = memory_harness();
        let err = h
            .service
            .create(&Identity::new_guest(), request("https://example.org", Some("mine"), true))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let h = memory_harness();
        let user = Identity::user(1);

        for (url, alias) in [
            ("not a url", None),
            ("ftp://example.org", None),
            ("https://example.org", Some("api")),
            ("https://example.org", Some("a b")),
        ] {
            let err = h
                .service
                .create(&user, request(url, alias, false))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }), "{url} {alias:?}");
        }

        let past = NewLinkRequest {
            url: "https://example.org".to_string(),
            expires_at: Some(Utc::now() - chrono::Duration::minutes(1)),
            ..Default::default()
        };
        assert!(matches!(
            h.service.create(&user, past).await.unwrap_err(),
            AppError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn test_alias_scoping() {
        let h = memory_harness();
        let (a, b) = (Identity::user(1), Identity::user(2));

        h.service
            .create(&a, request("https://a.example", Some("xyz"), true))
            .await
            .unwrap();
        h.service
            .create(&b, request("https://b.example", Some("xyz"), true))
            .await
            .unwrap();
        h.service
            .create(&a, request("https://a.example", Some("xyz"), false))
            .await
            .unwrap();

        let err = h
            .service
            .create(&b, request("https://b.example", Some("xyz"), false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AliasExists { .. }));
    }

    #[tokio::test]
    async fn test_private_redirect_scoped_to_owner() {
        let h = memory_harness();
        let (a, b) = (Identity::user(1), Identity::user(2));
        h.tokens.issue(&a).await.unwrap();
        h.service
            .create(&a, request("https://secret.example", Some("mine"), true))
            .await
            .unwrap();

        let target = h
            .service
            .redirect(Some(&a), "mine", RedirectRoute::Private)
            .await
            .unwrap();
        assert_eq!(target.url, "https://secret.example/");

        let err = h
            .service
            .redirect(Some(&b), "mine", RedirectRoute::Private)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        let err = h
            .service
            .redirect(Some(&Identity::new_guest()), "mine", RedirectRoute::Private)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));

        let err = h
            .service
            .redirect(None, "mine", RedirectRoute::Public)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_second_redirect_served_from_cache() {
        let store = Arc::new(CountingStore {
            inner: MemoryLinkStore::new(),
            lookups: AtomicUsize::new(0),
        });
        let mut h = harness(store.clone(), Arc::new(MemoryTokenStore::new()));
        let guest = Identity::new_guest();
        let link = h
            .service
            .create(&guest, request("https://example.org", Some("cached"), false))
            .await
            .unwrap();

        for _ in 0..2 {
            let target = h
                .service
                .redirect(None, "cached", RedirectRoute::Public)
                .await
                .unwrap();
            assert_eq!(target.row_id, link.id);
        }

        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
        assert!(h.visits.try_recv().is_ok());
        assert!(h.visits.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_user_link_not_cached_without_session() {
        let h = memory_harness();
        let user = Identity::user(3);
        h.service
            .create(&user, request("https://example.org", Some("nosession"), false))
            .await
            .unwrap();

        h.service
            .redirect(None, "nosession", RedirectRoute::Public)
            .await
            .unwrap();
        assert!(h.cache.is_empty());

        h.tokens.issue(&user).await.unwrap();
        h.service
            .redirect(None, "nosession", RedirectRoute::Public)
            .await
            .unwrap();
        assert_eq!(h.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_link_does_not_resolve() {
        let mut mock_store = MockLinkStore::new();
        mock_store.expect_find_public().returning(|alias| {
            let mut link = sample_link(1, alias, Identity::new_guest(), false);
            link.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
            Ok(Some(link))
        });

        let h = harness(Arc::new(mock_store), Arc::new(MockTokenStore::new()));
        let err = h
            .service
            .redirect(None, "old", RedirectRoute::Public)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
        assert!(h.cache.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_not_swallowed() {
        let mut mock_store = MockLinkStore::new();
        mock_store
            .expect_find_public()
            .returning(|_| Err(AppError::transient("down", json!({}))));

        let h = harness(Arc::new(mock_store), Arc::new(MockTokenStore::new()));
        let err = h
            .service
            .redirect(None, "any", RedirectRoute::Public)
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_stale_update_does_not_mutate() {
        let h = memory_harness();
        let user = Identity::user(1);
        let link = h
            .service
            .create(&user, request("https://example.org", Some("upd"), false))
            .await
            .unwrap();
        let patch = TinylinkPatch {
            url: Some("https://rust-lang.org".to_string()),
            ..Default::default()
        };

        let updated = h
            .service
            .update(&user, link.id, 1, patch.clone())
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.url, "https://rust-lang.org/");

        let stale = TinylinkPatch {
            url: Some("https://stale.example".to_string()),
            ..Default::default()
        };
        let err = h.service.update(&user, link.id, 1, stale).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        let current = h.service.list(&user).await.unwrap();
        assert_eq!(current[0].url, "https://rust-lang.org/");
        assert_eq!(current[0].version, 2);

        let err = h
            .service
            .update(&Identity::user(2), link.id, 2, patch)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_evicts_cache() {
        let h = memory_harness();
        let guest = Identity::new_guest();
        let link = h
            .service
            .create(&guest, request("https://old.example", Some("move"), false))
            .await
            .unwrap();
        h.service
            .redirect(None, "move", RedirectRoute::Public)
            .await
            .unwrap();
        assert_eq!(h.cache.len(), 1);

        h.service
            .update(
                &guest,
                link.id,
                link.version,
                TinylinkPatch {
                    url: Some("https://new.example".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let target = h
            .service
            .redirect(None, "move", RedirectRoute::Public)
            .await
            .unwrap();
        assert_eq!(target.url, "https://new.example/");
    }

    #[tokio::test]
    async fn test_delete_removes_both_namespaces() {
        let h = memory_harness();
        let user = Identity::user(1);
        h.tokens.issue(&user).await.unwrap();
        h.service
            .create(&user, request("https://pub.example", Some("dup"), false))
            .await
            .unwrap();
        h.service
            .create(&user, request("https://priv.example", Some("dup"), true))
            .await
            .unwrap();
        h.service
            .redirect(Some(&user), "dup", RedirectRoute::Private)
            .await
            .unwrap();

        let removed = h.service.delete(&user, "dup").await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(h.cache.is_empty());

        let err = h.service.delete(&user, "dup").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_owner_scoped() {
        let h = memory_harness();
        h.service
            .create(&Identity::user(1), request("https://example.org", Some("keep"), false))
            .await
            .unwrap();

        let err = h
            .service
            .delete(&Identity::user(2), "keep")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(h.service.list(&Identity::user(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_full_visit_queue_does_not_block_redirect() {
        let store = Arc::new(MemoryLinkStore::new());
        let cache: Arc<dyn LinkCache> = Arc::new(MemoryCache::new());
        let tokens = Arc::new(TokenService::new(
            Arc::new(MemoryTokenStore::new()),
            "test-signing-secret-test-signing-secret".to_string(),
            chrono::Duration::days(7),
            Duration::from_secs(1),
        ));
        let (tx, _rx) = mpsc::channel(1);
        let service = LinkService::new(
            store,
            cache,
            tokens,
            tx,
            LinkSettings {
                guest_cache_ttl: Duration::ZERO,
                store_timeout: Duration::from_secs(1),
            },
        );
        let guest = Identity::new_guest();
        service
            .create(&guest, request("https://example.org", Some("busy"), false))
            .await
            .unwrap();

        for _ in 0..3 {
            service
                .redirect(None, "busy", RedirectRoute::Public)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_health_reports_closed_queue() {
        let h = memory_harness();
        assert!(h.service.health().await.is_healthy());

        drop(h.visits);
        assert!(!h.service.health().await.visit_queue);
    }
}
