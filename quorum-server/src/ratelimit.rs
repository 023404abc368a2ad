//! Sliding-window rate limiting
//!
//! In-memory, single-process, exact window semantics: each key holds the
//! timestamps of its requests within the trailing window. A request is
//! allowed while fewer than `max_requests` timestamps remain inside the
//! window; otherwise `reset_ms` reports the time until the oldest one
//! expires. Two independent instances guard review submission and
//! follow-up chat, each with its own window and maximum.

use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Time until the oldest in-window request expires; 0 when allowed
    pub reset_ms: u64,
}

/// Per-key sliding-window admission gate
pub struct RateLimiter {
    window_ms: u64,
    max_requests: usize,
    windows: Mutex<HashMap<String, Vec<u64>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window_ms: window.as_millis() as u64,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether `key` may proceed now, recording the request if so
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, now_ms())
    }

    fn check_at(&self, key: &str, now: u64) -> RateDecision {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let timestamps = windows.entry(key.to_string()).or_default();

        // Drop timestamps that have left the trailing window
        let window_start = now.saturating_sub(self.window_ms);
        timestamps.retain(|&t| t > window_start);

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.first().copied().unwrap_or(now);
            return RateDecision {
                allowed: false,
                reset_ms: (oldest + self.window_ms).saturating_sub(now),
            };
        }

        timestamps.push(now);
        RateDecision {
            allowed: true,
            reset_ms: 0,
        }
    }
}

/// Current time in milliseconds since the Unix epoch
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Rate-limit key for a request: authenticated identity when available,
/// otherwise the network origin from `x-forwarded-for`.
pub fn rate_limit_key(user_id: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(id) = user_id {
        if !id.is_empty() {
            return format!("user:{id}");
        }
    }

    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown");
    format!("ip:{ip}")
}
