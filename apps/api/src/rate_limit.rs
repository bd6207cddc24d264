//! Per-client fixed-window rate limiting, applied as an axum middleware layer
//! in front of the pitch route.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tracing::warn;

use crate::errors::AppError;

/// Number of checks between sweeps of expired windows.
const SWEEP_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Admits at most `limit` requests per key per `window`.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    trust_forwarded_for: bool,
    windows: DashMap<IpAddr, Window>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration, trust_forwarded_for: bool) -> Self {
        Self {
            limit,
            window,
            trust_forwarded_for,
            windows: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    pub fn per_minute(limit: u32, trust_forwarded_for: bool) -> Self {
        Self::new(limit, Duration::from_secs(60), trust_forwarded_for)
    }

    /// Records one request for `key` at `now`.
    /// Returns the seconds until the window resets when the key is over quota.
    pub fn check_at(&self, key: IpAddr, now: Instant) -> Result<(), u64> {
        self.maybe_sweep(now);

        let mut entry = self.windows.entry(key).or_insert(Window {
            started: now,
            count: 0,
        });
        let window = entry.value_mut();

        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count >= self.limit {
            let remaining = self.window.saturating_sub(now.duration_since(window.started));
            // Round up so a client never retries a fraction of a second early.
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(secs.max(1));
        }

        window.count += 1;
        Ok(())
    }

    pub fn check(&self, key: IpAddr) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn maybe_sweep(&self, now: Instant) {
        let n = self.checks.fetch_add(1, Ordering::Relaxed);
        if n % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.windows
                .retain(|_, w| now.duration_since(w.started) < self.window);
        }
    }

    /// Picks the rate-limit key for a request: the first `X-Forwarded-For`
    /// address when trusted, otherwise the peer address.
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
        if self.trust_forwarded_for {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if forwarded.is_some() {
                return forwarded;
            }
        }
        peer.map(|addr| addr.ip())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Middleware: rejects with 429 before the handler runs once a client is over quota.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match limiter.client_key(request.headers(), peer) {
        Some(key) => {
            if let Err(retry_after_secs) = limiter.check(key) {
                warn!("Rate limit exceeded for {key}");
                return Err(AppError::RateLimited { retry_after_secs });
            }
        }
        None => warn!("No client address available; skipping rate limit"),
    }

    Ok(next.run(request).await)
}
