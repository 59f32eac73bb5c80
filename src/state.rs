//! Shared application state injected into handlers and middleware.

use chrono::Duration;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::services::{
    CredentialSigner, IdentityResolver, LinkService, LinkSettings, TokenService,
};
use crate::config::Config;
use crate::domain::repositories::{LinkStore, TokenStore};
use crate::domain::visit_event::VisitEvent;
use crate::infrastructure::cache::LinkCache;

/// Issuer claim of access credentials.
pub const TOKEN_ISSUER: &str = "tinylink";

/// Link service over the engine chosen at startup.
pub type DynLinkService = LinkService<dyn LinkStore, dyn TokenStore>;

/// Identity resolver over the engine chosen at startup.
pub type DynIdentityResolver = IdentityResolver<dyn TokenStore>;

/// Attributes of the credential cookies written by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub guest_max_age_seconds: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<DynLinkService>,
    pub identity_resolver: Arc<DynIdentityResolver>,
    pub cookies: CookieSettings,
}

impl AppState {
    /// Wires the services over already-connected stores and cache.
    pub fn new(
        link_store: Arc<dyn LinkStore>,
        token_store: Arc<dyn TokenStore>,
        cache: Arc<dyn LinkCache>,
        visit_sender: mpsc::Sender<VisitEvent>,
        config: &Config,
    ) -> Self {
        let store_timeout = std::time::Duration::from_millis(config.store_timeout_ms);

        let signer = Arc::new(CredentialSigner::new(
            config.token_signing_secret.as_bytes(),
            TOKEN_ISSUER,
            Duration::seconds(config.access_token_ttl_seconds),
        ));
        let tokens = Arc::new(TokenService::new(
            token_store,
            config.token_signing_secret.clone(),
            Duration::seconds(config.refresh_token_ttl_seconds),
            store_timeout,
        ));

        let link_service = Arc::new(LinkService::new(
            link_store,
            cache,
            tokens.clone(),
            visit_sender,
            LinkSettings {
                guest_cache_ttl: std::time::Duration::from_secs(config.cache_ttl_seconds),
                store_timeout,
            },
        ));

        Self {
            link_service,
            identity_resolver: Arc::new(IdentityResolver::new(signer, tokens)),
            cookies: CookieSettings {
                secure: config.cookie_secure,
                guest_max_age_seconds: config.guest_cookie_max_age_seconds,
            },
        }
    }
}
