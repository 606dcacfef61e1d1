//! Per-client rate limiting.
//!
//! Clients are keyed by IP: the first `X-Forwarded-For` entry when the
//! proxy sits behind a load balancer, otherwise the socket peer address.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use fire_common::FireError;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::error::ApiError;
use crate::state::AppState;

/// Keyed token-bucket limiter, one bucket per client IP.
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    per_minute: u32,
}

impl ClientRateLimiter {
    pub fn per_minute(requests: u32) -> Self {
        let per_minute = requests.max(1);
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::keyed(quota),
            per_minute,
        }
    }

    pub fn quota_per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Take one request slot for `client`. Returns false when over quota.
    pub fn check(&self, client: IpAddr) -> bool {
        self.limiter.check_key(&client).is_ok()
    }

    /// Drop buckets of clients that have been idle long enough to be full.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Best-effort client address for a request.
pub fn client_ip(req: &Request) -> IpAddr {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Middleware rejecting over-quota clients with 429.
pub async fn rate_limit_middleware(req: Request, next: Next) -> Response {
    let Some(state) = req.extensions().get::<Arc<AppState>>().cloned() else {
        return next.run(req).await;
    };

    let client = client_ip(&req);
    if !state.limiter.check(client) {
        crate::metrics::record_rate_limited();
        tracing::info!(client = %client, path = %req.uri().path(), "Rate limit exceeded");
        return ApiError(FireError::RateLimited).into_response();
    }

    next.run(req).await
}
