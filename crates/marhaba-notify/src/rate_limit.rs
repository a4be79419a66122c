//! Fixed-window rate limiting per client address.
//!
//! Each client IP gets a counter that starts with its first request and resets
//! once the window has elapsed. Requests beyond `max_requests` inside a window
//! are answered with `429 Too Many Requests` and never reach a handler.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::state::AppState;

/// Message returned to rejected clients.
pub const DEFAULT_REJECTION_MESSAGE: &str = "Too many requests, please try again later.";

/// Rate limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per client within one window.
    pub max_requests: u32,

    /// Window length.
    pub window: Duration,

    /// Plain-text body sent with a rejection.
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            message: DEFAULT_REJECTION_MESSAGE.to_string(),
        }
    }
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request admitted; `remaining` more are allowed in this window.
    Allowed { remaining: u32, reset_after: Duration },
    /// Request rejected until the window resets.
    Limited { reset_after: Duration },
}

/// Counter for one client in its current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window limiter keyed by client IP.
///
/// Thread-safe: all counters are protected by a mutex.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request from `client` and decide whether to admit it.
    pub fn check(&self, client: IpAddr) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Decision {
        let mut windows = self.windows.lock();
        let window = windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= self.config.window {
            window.started = now;
            window.count = 0;
        }

        window.count = window.count.saturating_add(1);
        let reset_after = self
            .config
            .window
            .saturating_sub(now.saturating_duration_since(window.started));

        if window.count > self.config.max_requests {
            Decision::Limited { reset_after }
        } else {
            Decision::Allowed {
                remaining: self.config.max_requests - window.count,
                reset_after,
            }
        }
    }

    /// Drop counters whose window has ended. Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started) < self.config.window);
        before - windows.len()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().len()
    }

    /// Periodically prune expired counters, once per window.
    pub fn spawn_pruner(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.window);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.prune();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = self.tracked_clients(),
                        "pruned rate limit windows"
                    );
                }
            }
        })
    }
}

/// Middleware enforcing the shared [`RateLimiter`].
///
/// The client is identified by the peer address from `ConnectInfo`. Requests
/// without one (e.g., in-process tests) share a single bucket.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip());

    let limiter = &state.limiter;
    let limit = limiter.config().max_requests;

    match limiter.check(client) {
        Decision::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            insert_limit_headers(response.headers_mut(), limit, remaining, reset_after);
            response
        }
        Decision::Limited { reset_after } => {
            tracing::warn!(client = %client, "rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                limiter.config().message.clone(),
            )
                .into_response();
            insert_limit_headers(response.headers_mut(), limit, 0, reset_after);
            response
        }
    }
}

fn insert_limit_headers(
    headers: &mut HeaderMap,
    limit: u32,
    remaining: u32,
    reset_after: Duration,
) {
    // Round up so a client never retries before the window has actually reset
    let reset_secs = reset_after.as_secs() + u64::from(reset_after.subsec_nanos() > 0);
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_secs));
}
