//! HTTP server initialization and runtime setup.
//!
//! Handles store and cache selection, worker spawning, and the Axum server
//! lifecycle.

use crate::api::middleware::rate_limit::RateLimitSettings;
use crate::config::{Config, StorageBackend};
use crate::domain::repositories::{LinkStore, TokenStore};
use crate::domain::visit_worker::run_visit_worker;
use crate::infrastructure::cache::{LinkCache, MemoryCache, RedisCache};
use crate::infrastructure::persistence::{
    MemoryLinkStore, MemoryTokenStore, PgLinkStore, PgTokenStore,
};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// The link and refresh token stores of the configured engine.
pub struct Stores {
    pub links: Arc<dyn LinkStore>,
    pub tokens: Arc<dyn TokenStore>,
}

/// Opens the PostgreSQL pool with the configured limits and applies pending
/// migrations.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing, the database is unreachable
/// or a migration fails.
pub async fn connect_pool(config: &Config) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres backend")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    Ok(pool)
}

/// Builds the stores selected by `STORAGE_BACKEND`.
pub async fn connect_stores(config: &Config) -> Result<Stores> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = Arc::new(connect_pool(config).await?);

            Ok(Stores {
                links: Arc::new(PgLinkStore::new(pool.clone())),
                tokens: Arc::new(PgTokenStore::new(pool)),
            })
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            Ok(Stores {
                links: Arc::new(MemoryLinkStore::new()),
                tokens: Arc::new(MemoryTokenStore::new()),
            })
        }
    }
}

/// Connects Redis when configured, falling back to the in-process cache.
pub async fn connect_cache(config: &Config) -> Arc<dyn LinkCache> {
    if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                return Arc::new(redis);
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using in-process cache.", e);
            }
        }
    } else {
        tracing::info!("Cache: in-process");
    }

    Arc::new(MemoryCache::new())
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Link and refresh token stores (PostgreSQL with migrations, or in-memory)
/// - Redis cache (or in-process fallback), with the alias counter raised to
///   the store's floor
/// - Background visit worker
/// - Axum HTTP server with graceful shutdown
///
/// On shutdown the visit queue is closed and the worker drains it before this
/// returns.
///
/// # Errors
///
/// Returns an error if:
/// - Store connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let stores = connect_stores(&config).await?;
    let cache = connect_cache(&config).await;

    let (visit_tx, visit_rx) = mpsc::channel(config.visit_queue_capacity);
    let worker = tokio::spawn(run_visit_worker(
        visit_rx,
        stores.links.clone(),
        config.visit_worker_concurrency,
        Duration::from_millis(config.store_timeout_ms),
    ));
    tracing::info!(
        concurrency = config.visit_worker_concurrency,
        "Visit worker started"
    );

    let state = AppState::new(stores.links, stores.tokens, cache, visit_tx, &config);
    // A flushed or replaced counter would otherwise reissue existing aliases.
    state
        .link_service
        .seed_alias_counter()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed alias counter: {e}"))?;
    let app = app_router(state, &RateLimitSettings::from_config(&config))?;

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router (and with it the last visit sender) is gone once `serve`
    // returns, so the worker sees a closed channel and finishes.
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Visit worker panicked");
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Waits for SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
