//! Per-IP rate limiting for the `/api` tree, backed by governor's keyed
//! token buckets so it is safe to share across worker tasks.

use std::{net::IpAddr, sync::Arc, time::Duration};

use axum::http::Request;
use governor::{
    RateLimiter,
    clock::{DefaultClock, QuantaInstant},
    middleware::NoOpMiddleware,
    state::keyed::DefaultKeyedStateStore,
};
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::middleware::client_ip::client_ip;

#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req.headers(), req.extensions()).ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type ClientLimiter = RateLimiter<
    IpAddr,
    DefaultKeyedStateStore<IpAddr>,
    DefaultClock,
    NoOpMiddleware<QuantaInstant>,
>;

pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Replenish interval that spreads `per_minute` requests evenly over a minute.
pub fn replenish_interval(per_minute: u32) -> Duration {
    Duration::from_secs(60) / per_minute.max(1)
}

/// How often buckets of clients that have gone quiet are dropped.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Allows a burst of `per_minute` requests per client, refilled evenly over a minute.
///
/// Keys come from client-supplied headers, so a background task prunes idle
/// buckets every [`PRUNE_INTERVAL`] to keep the map bounded. The task ends
/// once the layer has been dropped. Must be called inside a Tokio runtime.
pub fn api_rate_limiter(per_minute: u32) -> anyhow::Result<RateLimiterLayer> {
    let per_minute = per_minute.max(1);
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .period(replenish_interval(per_minute))
        .burst_size(per_minute)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?;

    let limiter = Arc::downgrade(config.limiter());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            let clients = prune_idle(&limiter);
            tracing::debug!(clients, "pruned rate limiter buckets");
        }
    });

    Ok(GovernorLayer::new(Arc::new(config)))
}

/// Drops the buckets of clients that are back to a full burst and returns
/// how many clients are still tracked.
pub fn prune_idle(limiter: &ClientLimiter) -> usize {
    limiter.retain_recent();
    limiter.len()
}
