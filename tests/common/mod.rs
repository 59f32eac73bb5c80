#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tinylink::application::services::{CredentialSigner, NewLinkRequest};
use tinylink::config::{Config, StorageBackend};
use tinylink::domain::entities::{Identity, Tinylink};
use tinylink::domain::visit_event::VisitEvent;
use tinylink::infrastructure::cache::MemoryCache;
use tinylink::infrastructure::persistence::{MemoryLinkStore, MemoryTokenStore};
use tinylink::routes::unlimited_router;
use tinylink::state::{AppState, TOKEN_ISSUER};
use tokio::sync::mpsc;

pub const SIGNING_SECRET: &str = "integration-signing-secret-0123456789";

pub fn test_config() -> Config {
    Config {
        storage_backend: StorageBackend::Memory,
        database_url: None,
        redis_url: None,
        listen_addr: "127.0.0.1:0".to_string(),
        log_level: "info".to_string(),
        log_format: "text".to_string(),
        behind_proxy: false,
        token_signing_secret: SIGNING_SECRET.to_string(),
        access_token_ttl_seconds: 900,
        refresh_token_ttl_seconds: 3600,
        guest_cookie_max_age_seconds: 86_400,
        cookie_secure: true,
        cache_ttl_seconds: 60,
        store_timeout_ms: 1000,
        visit_queue_capacity: 100,
        visit_worker_concurrency: 1,
        rate_limit_per_second: 10,
        rate_limit_burst: 100,
        db_max_connections: 1,
        db_connect_timeout: 1,
        db_idle_timeout: 1,
        db_max_lifetime: 1,
    }
}

/// Memory-backed state plus the receiving end of the visit queue.
pub fn create_test_state() -> (AppState, mpsc::Receiver<VisitEvent>) {
    let (tx, rx) = mpsc::channel(100);

    let state = AppState::new(
        Arc::new(MemoryLinkStore::new()),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(MemoryCache::new()),
        tx,
        &test_config(),
    );

    (state, rx)
}

pub fn make_server(state: AppState) -> TestServer {
    TestServer::new(unlimited_router(state)).unwrap()
}

/// Signs an access credential for `identity` that expired a minute ago.
pub fn expired_access(identity: &Identity) -> String {
    let signer = CredentialSigner::new(
        SIGNING_SECRET.as_bytes(),
        TOKEN_ISSUER,
        Duration::seconds(test_config().access_token_ttl_seconds),
    );
    signer
        .issue_at(identity, Utc::now() - Duration::seconds(960))
        .unwrap()
}

pub async fn create_link(
    state: &AppState,
    owner: &Identity,
    alias: &str,
    url: &str,
    private: bool,
) -> Tinylink {
    state
        .link_service
        .create(
            owner,
            NewLinkRequest {
                url: url.to_string(),
                alias: Some(alias.to_string()),
                private,
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

/// All `Set-Cookie` values of a response.
pub fn set_cookies(response: &axum_test::TestResponse) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of cookie `name` set by a response.
pub fn cookie_value(response: &axum_test::TestResponse, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let (pair, _) = cookie.split_once(';')?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
