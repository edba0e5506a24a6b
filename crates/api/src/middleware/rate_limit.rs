//! Per-client rate limiting for invitation lookups.
//!
//! Search is the only unauthenticated endpoint that reveals guest data, so
//! it is throttled per client address. The address is the TCP peer unless
//! `security.trust_forwarded_for` is set, in which case the first
//! `X-Forwarded-For` hop written by the fronting proxy is used.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter as GovRateLimiter,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use crate::app::AppState;
use crate::error::ApiError;

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Rate limiter state shared across all requests, keyed by client address.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    rate_limit_per_minute: u32,
    trust_forwarded_for: bool,
}

impl RateLimiterState {
    pub fn new(rate_limit_per_minute: u32, trust_forwarded_for: bool) -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(rate_limit_per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: GovRateLimiter::keyed(quota),
            rate_limit_per_minute,
            trust_forwarded_for,
        }
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Returns `Err(retry_after_secs)` when the client is over its quota.
    pub fn check(&self, client: IpAddr) -> Result<(), u64> {
        self.limiter.check_key(&client).map_err(|not_until| {
            let wait_time = not_until.wait_time_from(DefaultClock::default().now());
            wait_time.as_secs().max(1)
        })
    }

    /// Drops clients whose quota has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Address the request is counted against.
    fn client_addr(&self, req: &Request<Body>) -> IpAddr {
        if self.trust_forwarded_for {
            if let Some(forwarded) = forwarded_for(req) {
                return forwarded;
            }
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("tracked_clients", &self.tracked_clients())
            .finish()
    }
}

/// First `X-Forwarded-For` hop, when it parses as an address.
fn forwarded_for(req: &Request<Body>) -> Option<IpAddr> {
    req.headers()
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|hop| hop.trim().parse().ok())
}

/// Middleware that throttles invitation searches per client.
pub async fn search_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = state.rate_limiter.client_addr(&req);
    if let Err(retry_after) = state.rate_limiter.check(client) {
        tracing::warn!(client = %client, retry_after = retry_after, "Search rate limited");
        return ApiError::RateLimited {
            limit_per_minute: state.rate_limiter.rate_limit_per_minute(),
            retry_after,
        }
        .into_response();
    }

    next.run(req).await
}

/// Prunes idle clients from the limiter every `interval`.
pub fn spawn_rate_limit_pruning(limiter: Arc<RateLimiterState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            limiter.prune();
            tracing::debug!(
                tracked_clients = limiter.tracked_clients(),
                "Pruned search rate limiter"
            );
        }
    });
}
