// src/rate_limit.rs
//! In-memory sliding-window rate limiter keyed by client IP.
//!
//! Shared process-wide state; callers wrap it in an `Arc` and attach
//! [`rate_limit_mw`] to the routes that should be limited.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    requests_per_window: usize,
    window: Duration,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(requests_per_window: usize) -> Self {
        Self::with_window(requests_per_window, WINDOW)
    }

    pub fn with_window(requests_per_window: usize, window: Duration) -> Self {
        Self {
            requests_per_window,
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Record a hit for this client. Returns false when the window is
    /// already full; expired hits are dropped first.
    pub fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut map = self.requests.lock().expect("limiter mutex poisoned");
        let hits = map.entry(client.to_string()).or_default();
        hits.retain(|t| now.duration_since(*t) < self.window);
        if hits.len() >= self.requests_per_window {
            return false;
        }
        hits.push(now);
        true
    }
}

/// Client key: first entry of X-Forwarded-For, else "unknown". Good enough
/// behind a single trusted proxy, which is the deployment shape here.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware: reject with 429 once a client exhausts its window.
pub async fn rate_limit_mw(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(req.headers());
    if !limiter.check(&client) {
        tracing::warn!(client = %client, "rate limit exceeded");
        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": "rate_limit_exceeded",
                "message": "Too many requests. Please try again later.",
                "retry_after_seconds": 60,
            }
        });
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        // Other clients are unaffected.
        assert!(limiter.check("5.6.7.8"));
    }

    #[test]
    fn window_expiry_frees_capacity() {
        let limiter = RateLimiter::with_window(1, Duration::from_millis(20));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("1.2.3.4"));
    }

    #[test]
    fn client_key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers), "unknown");
        headers.insert("x-forwarded-for", "9.9.9.9, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers), "9.9.9.9");
    }
}
