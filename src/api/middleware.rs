//! Bearer-token authentication and rate limiting for the HTTP boundary.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Boundary security settings, loaded from `RICEBOARD_*` environment
/// variables. Everything is off by default, which is the local-development
/// mode; setting an API key switches the server into remote mode and also
/// enables rate limiting.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Bearer token required on every request (RICEBOARD_API_KEY).
    pub api_key: Option<String>,
    /// Allowed CORS origins (RICEBOARD_CORS_ORIGINS, comma-separated).
    /// `None` means permissive.
    pub cors_origins: Option<Vec<String>>,
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("RICEBOARD_API_KEY").ok();

        let cors_origins = std::env::var("RICEBOARD_CORS_ORIGINS")
            .ok()
            .map(|s| s.split(',').map(|o| o.trim().to_string()).collect());

        let per_minute = std::env::var("RICEBOARD_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(100);

        // Rate limiting only matters once the server is exposed, which is
        // what configuring an API key signals.
        let rate_limiter = api_key
            .is_some()
            .then(|| RateLimiter::new(per_minute, Duration::from_secs(60)));

        Self {
            api_key,
            cors_origins,
            rate_limiter,
        }
    }

    /// No authentication, no rate limiting. Local development and tests.
    pub fn disabled() -> Self {
        Self {
            api_key: None,
            cors_origins: None,
            rate_limiter: None,
        }
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            cors_origins: None,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limit(per_minute: u32) -> Self {
        Self {
            api_key: None,
            cors_origins: None,
            rate_limiter: Some(RateLimiter::new(per_minute, Duration::from_secs(60))),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Sliding-window request limiter, tracked per client IP.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    hits: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records a hit for `ip` and reports whether it is still under the
    /// limit.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let cutoff = now - self.window;

        let mut hits = self.hits.lock().expect("rate limiter lock poisoned");
        let recent = hits.entry(ip).or_default();
        recent.retain(|&t| t > cutoff);

        if recent.len() < self.limit as usize {
            recent.push(now);
            true
        } else {
            false
        }
    }
}

/// Rejects requests without the configured bearer token. A config without
/// an API key lets everything through.
pub async fn require_bearer(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => {
            tracing::warn!("Rejected request with missing or invalid bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn enforce_rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = client_ip(&request);

    if limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Rate limit exceeded for {}", ip);
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Client address as seen through proxies, falling back to localhost.
fn client_ip(request: &Request<Body>) -> IpAddr {
    let header_ip = |name: &str| -> Option<IpAddr> {
        request
            .headers()
            .get(name)?
            .to_str()
            .ok()?
            .split(',')
            .next()?
            .trim()
            .parse()
            .ok()
    };

    header_ip("X-Forwarded-For")
        .or_else(|| header_ip("X-Real-IP"))
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}
