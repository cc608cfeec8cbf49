//! Per-client rate limiting for `/api` routes.
//!
//! Each client IP gets its own governor bucket, so one noisy client cannot
//! use up the quota of everyone else. The IP comes from axum's
//! `ConnectInfo<SocketAddr>`; requests without it share one bucket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::context::AppContext;

/// A shared limiter keyed by client IP.
pub type SharedLimiter = Arc<DefaultKeyedRateLimiter<IpAddr>>;

/// Create a limiter allowing `requests_per_minute` per client, or `None`
/// when it is 0.
pub fn create_limiter(requests_per_minute: u32) -> Option<SharedLimiter> {
    let per_minute = NonZeroU32::new(requests_per_minute)?;
    Some(Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))))
}

/// Key used for a request.
pub fn client_ip<B>(request: &Request<B>) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware. Returns 429 Too Many Requests when the
/// caller's bucket is empty.
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    if let Some(limiter) = &ctx.limiter {
        let ip = client_ip(&request);
        if limiter.check_key(&ip).is_err() {
            tracing::debug!(client = %ip, path = %request.uri().path(), "Rate limit exceeded");
            return Err((StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response());
        }
    }

    Ok(next.run(request).await)
}

/// Periodically forget buckets that have refilled, keeping the key map
/// bounded by the set of recently active clients.
pub async fn prune_idle_clients(limiter: SharedLimiter, every: std::time::Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        limiter.retain_recent();
        limiter.shrink_to_fit();
        tracing::trace!(clients = limiter.len(), "Pruned idle rate-limit buckets");
    }
}
