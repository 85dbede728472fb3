use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::task::JoinHandle;

use super::{auth::ClientIp, session::AppState};
use crate::error::AppError;

/// Fixed-window request counter keyed by client address
#[derive(Debug, Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    max_requests: u32,
    window: Duration,
}

#[derive(Debug)]
struct RateLimitEntry {
    requests: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_requests,
            window,
        }
    }

    /// Counts one request for `key`; false once the window's budget is spent
    pub fn check(&self, key: &str, now: Instant) -> bool {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                requests: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.requests = 0;
            entry.window_start = now;
        }

        if entry.requests >= self.max_requests {
            return false;
        }

        entry.requests += 1;
        true
    }

    /// Drops counters whose window has closed
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < self.window);
        before - self.entries.len()
    }

    /// Sweeps closed windows once per window length
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window);
            interval.tick().await;

            loop {
                interval.tick().await;
                let purged = limiter.purge_expired(Instant::now());
                if purged > 0 {
                    tracing::debug!(purged, "Rate limit counters purged");
                }
            }
        })
    }
}

/// Rejects clients that exceed the per-address request budget
pub async fn rate_limit(
    State(state): State<AppState>,
    ip: ClientIp,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = ip.as_deref().unwrap_or("unknown");

    if !state.rate_limiter.check(key, Instant::now()) {
        tracing::warn!(client_ip = %key, "Rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}
