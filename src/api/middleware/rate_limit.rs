//! Per-client rate limiting using a token bucket.

use anyhow::{Context, Result};
use axum::Router;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::{GovernorConfig, GovernorConfigBuilder},
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};

use crate::config::Config;
use crate::state::AppState;

/// Token bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Tokens replenished per second.
    pub per_second: u64,
    /// Bucket size.
    pub burst: u32,
    /// Read the client IP from `X-Forwarded-For` / `X-Real-IP` instead of the
    /// socket peer address. Only safe behind a trusted reverse proxy.
    pub behind_proxy: bool,
}

impl RateLimitSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            per_second: config.rate_limit_per_second,
            burst: config.rate_limit_burst,
            behind_proxy: config.behind_proxy,
        }
    }
}

type LimiterConfig<K> = Arc<GovernorConfig<K, NoOpMiddleware<QuantaInstant>>>;

fn limiter_config<K: KeyExtractor>(key: K, settings: &RateLimitSettings) -> Result<LimiterConfig<K>> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(key)
        .per_second(settings.per_second)
        .burst_size(settings.burst)
        .finish()
        .context("Rate limit must have a positive rate and burst")?;

    Ok(Arc::new(config))
}

/// Wraps `router` with a per-IP limiter.
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Example
///
/// ```rust,ignore
/// let api = rate_limit::apply(api::routes::protected_routes(state.clone()), &settings)?;
/// ```
pub fn apply(router: Router<AppState>, settings: &RateLimitSettings) -> Result<Router<AppState>> {
    if settings.behind_proxy {
        let config = limiter_config(SmartIpKeyExtractor, settings)?;
        Ok(router.layer(GovernorLayer::new(config)))
    } else {
        let config = limiter_config(PeerIpKeyExtractor, settings)?;
        Ok(router.layer(GovernorLayer::new(config)))
    }
}
