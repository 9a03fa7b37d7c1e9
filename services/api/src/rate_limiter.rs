//! Rate limiter for throttling login, registration and API traffic
//!
//! Keyed fixed-window counters held in memory. Callers compose keys such as
//! `login:ip:1.2.3.4` or `register:domain:example.com` and pass the window
//! that applies; when several limits cover one request the most restrictive
//! one wins because every limit is checked.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// A single limit: so many attempts per window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_attempts: u32,
    pub window: Duration,
}

impl RateLimit {
    pub const fn per_minute(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            window: Duration::from_secs(60),
        }
    }

    pub const fn per_hour(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            window: Duration::from_secs(3600),
        }
    }
}

/// The limits the service applies, overridable for tests.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    /// Login attempts per client IP
    pub login_per_ip: RateLimit,
    /// Login attempts per submitted email
    pub login_per_email: RateLimit,
    /// Registrations per client IP
    pub register_per_ip: RateLimit,
    /// Registrations per email domain
    pub register_per_domain: RateLimit,
    /// Generic API requests per client IP
    pub api: RateLimit,
    /// Authenticated requests per user id
    pub authenticated: RateLimit,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login_per_ip: RateLimit::per_minute(5),
            login_per_email: RateLimit::per_minute(3),
            register_per_ip: RateLimit::per_hour(3),
            register_per_domain: RateLimit::per_hour(10),
            api: RateLimit::per_minute(60),
            authenticated: RateLimit::per_minute(30),
        }
    }
}

#[derive(Debug)]
struct WindowEntry {
    attempts: u32,
    window_start: Instant,
}

/// Rate limiter
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    entries: Arc<Mutex<HashMap<String, WindowEntry>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an attempt against `key`.
    ///
    /// Returns the remaining quota in the current window, or the duration to
    /// wait before the window resets once the limit is exceeded.
    pub async fn check(&self, key: &str, limit: RateLimit) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(WindowEntry {
            attempts: 0,
            window_start: now,
        });

        // Window expired, start a fresh one
        if now.duration_since(entry.window_start) >= limit.window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= limit.max_attempts {
            let retry_after = (entry.window_start + limit.window).saturating_duration_since(now);
            warn!(key, "rate limit exceeded");
            return Err(retry_after);
        }

        entry.attempts += 1;
        Ok(limit.max_attempts - entry.attempts)
    }

    /// Drop entries whose window has long expired.
    pub async fn cleanup(&self, max_window: Duration) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, entry| now.duration_since(entry.window_start) < max_window * 2);
    }
}

/// Convert a retry-after duration into whole seconds for the header,
/// rounding up so a client never retries early.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 { secs + 1 } else { secs.max(1) }
}
