//! Fixed-window rate limiting for the credential endpoints.

use crate::api::error::ApiError;
use crate::api::handlers::auth::{state::AuthState, utils::extract_client_ip};
use crate::api::observe::{op, Observation, Outcome};
use axum::{
    extract::{ConnectInfo, Extension, MatchedPath, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

/// Per-caller throttle. Implementations count every call, including the ones
/// they reject.
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> RateLimitDecision;
}

/// Pass-through limiter for tests and local hacking.
#[derive(Debug, Default)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Counts requests per key in fixed windows. The first request over the
/// ceiling is rejected with a hint of how long the window has left.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    window: Duration,
    max_requests: u32,
    max_entries: usize,
    windows: DashMap<String, Window>,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            max_entries: DEFAULT_MAX_ENTRIES,
            windows: DashMap::new(),
        }
    }

    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    fn sweep_stale(&self) {
        self.windows
            .retain(|_, window| window.started.elapsed() < self.window);
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, key: &str) -> RateLimitDecision {
        // Bound memory before tracking a new key.
        if self.windows.len() >= self.max_entries && !self.windows.contains_key(key) {
            self.sweep_stale();
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            started: Instant::now(),
            count: 0,
        });

        if entry.started.elapsed() >= self.window {
            entry.started = Instant::now();
            entry.count = 0;
        }

        entry.count += 1;

        if entry.count > self.max_requests {
            let remaining = self.window.saturating_sub(entry.started.elapsed());

            return RateLimitDecision::Limited {
                retry_after_seconds: remaining.as_secs().max(1),
            };
        }

        RateLimitDecision::Allowed
    }
}

/// Middleware guarding `/login` and `/register`. Rejected requests are
/// answered with 429 plus `Retry-After` and recorded as `blocked` for the
/// matched operation.
pub async fn throttle(
    Extension(state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match state.limiter().check(&key) {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited {
            retry_after_seconds,
        } => {
            if let Some(operation) = operation_for(&request) {
                let mut observation = Observation::begin(operation);
                observation.finish(Outcome::Blocked);
            }

            warn!("Rate limited {key}, retry in {retry_after_seconds}s");

            ApiError::RateLimited {
                retry_after_seconds,
            }
            .into_response()
        }
    }
}

/// Throttle key, proxy headers first with the socket peer as fallback.
fn client_key(request: &Request) -> String {
    if let Some(ip) = extract_client_ip(request.headers()) {
        return ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect| connect.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn operation_for(request: &Request) -> Option<&'static str> {
    let path = request.extensions().get::<MatchedPath>()?.as_str();

    match path {
        "/login" => Some(op::LOGIN),
        "/register" => Some(op::REGISTER),
        _ => None,
    }
}
