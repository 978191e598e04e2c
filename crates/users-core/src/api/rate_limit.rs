//! Per-client request limits for the REST API.
//!
//! Every endpoint (method plus route) keeps its own sliding one-minute window
//! of request instants per client address; the endpoint class only decides the
//! limit. The gate runs as middleware in front of the handler, so a rejected
//! request never reaches the service layer.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::Deserialize;

use super::error::ApiError;

// =============================================================================
// RateLimitConfig
// =============================================================================

/// Configuration for rate limiting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Register, login and streaming token requests.
    pub auth_per_minute: u32,
    pub devices_per_minute: u32,
    pub users_per_minute: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// How often idle client entries are dropped.
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth_per_minute: 5,
            devices_per_minute: 10,
            users_per_minute: 30,
            window_secs: 60,
            cleanup_interval_secs: 300,
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn limit_for(&self, class: EndpointClass) -> u32 {
        match class {
            EndpointClass::Auth => self.auth_per_minute,
            EndpointClass::Devices => self.devices_per_minute,
            EndpointClass::Users => self.users_per_minute,
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs.max(1))
    }
}

/// Group of routes sharing one per-endpoint limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Auth,
    Devices,
    Users,
}

impl EndpointClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Auth => "auth",
            EndpointClass::Devices => "devices",
            EndpointClass::Users => "users",
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("{limit} per minute")]
    TooManyRequests { limit: u32, retry_after: u64 },
}

// =============================================================================
// RateLimiter
// =============================================================================

/// Sliding window counter keyed by endpoint and client.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<(String, String), VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a request from `client` to `endpoint`, or refuse it if that
    /// window already holds the limit for `class`.
    pub fn check(&self, class: EndpointClass, endpoint: &str, client: &str) -> Result<(), RateLimitError> {
        self.check_at(class, endpoint, client, Instant::now())
    }

    fn check_at(
        &self,
        class: EndpointClass,
        endpoint: &str,
        client: &str,
        now: Instant,
    ) -> Result<(), RateLimitError> {
        if !self.config.enabled {
            return Ok(());
        }

        let limit = self.config.limit_for(class);
        let window = self.config.window();
        let mut entry = self
            .windows
            .entry((endpoint.to_string(), client.to_string()))
            .or_default();

        while let Some(oldest) = entry.front() {
            if now.duration_since(*oldest) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() >= limit as usize {
            let retry_after = entry
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)).as_secs().max(1))
                .unwrap_or(1);
            return Err(RateLimitError::TooManyRequests { limit, retry_after });
        }

        entry.push_back(now);
        Ok(())
    }

    /// Drop clients whose whole window has aged out.
    pub fn purge_stale(&self) {
        self.purge_stale_at(Instant::now());
    }

    fn purge_stale_at(&self, now: Instant) {
        let window = self.config.window();
        self.windows.retain(|_, hits| {
            hits.back()
                .map(|newest| now.duration_since(*newest) < window)
                .unwrap_or(false)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Periodically purge stale entries until the limiter is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let period = Duration::from_secs(self.config.cleanup_interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(limiter) => limiter.purge_stale(),
                    None => break,
                }
            }
        })
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// State handed to [`enforce_rate_limit`] for one route group.
#[derive(Debug, Clone)]
pub struct RateGate {
    pub limiter: Arc<RateLimiter>,
    pub class: EndpointClass,
}

/// `POST /auth/login`: method plus the route template, so `/devices/1` and
/// `/devices/2` count against the same window.
fn endpoint_label(request: &Request) -> String {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    format!("{} {}", request.method(), route)
}

/// Refuse the request with 429 once the client's window for this endpoint is full.
pub async fn enforce_rate_limit(State(gate): State<RateGate>, request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let endpoint = endpoint_label(&request);

    match gate.limiter.check(gate.class, &endpoint, &client) {
        Ok(()) => next.run(request).await,
        Err(RateLimitError::TooManyRequests { limit, retry_after }) => {
            tracing::warn!(
                client = %client,
                endpoint = %endpoint,
                class = gate.class.as_str(),
                limit,
                retry_after,
                "Rate limit exceeded"
            );
            ApiError::rate_limited(limit, retry_after).into_response()
        }
    }
}
