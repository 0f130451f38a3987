/// Global per-IP rate limiting
///
/// Token bucket per client IP, applied to the whole `/api` surface. The
/// window is 100 requests per 15 minutes: a full bucket of 100 tokens
/// refilling at 100/900 tokens per second.
///
/// State is an in-process map keyed by IP. Buckets idle for longer than the
/// window are pruned whenever the map grows past a watermark, so the map
/// stays bounded without a background task.
///
/// # Headers
///
/// Every response carries:
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: tokens left for this IP
/// - `Retry-After`: seconds to wait (429 responses only)

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::client_ip;

/// Requests allowed per window
pub const REQUESTS_PER_WINDOW: u32 = 100;

/// Window length in seconds (15 minutes)
pub const WINDOW_SECONDS: u64 = 900;

/// Prune idle buckets once the map grows past this
const PRUNE_WATERMARK: usize = 10_000;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Token bucket for one client IP
#[derive(Debug, Clone)]
struct TokenBucket {
    /// Current number of tokens
    tokens: f64,

    /// Last refill timestamp (Unix seconds)
    last_refill: u64,
}

impl TokenBucket {
    fn new(capacity: u32) -> Self {
        TokenBucket {
            tokens: capacity as f64,
            last_refill: unix_now(),
        }
    }

    /// Refills tokens based on elapsed time
    fn refill(&mut self, rate: f64, capacity: u32) {
        let now = unix_now();
        let elapsed_secs = now.saturating_sub(self.last_refill) as f64;
        let new_tokens = elapsed_secs * rate;

        self.tokens = (self.tokens + new_tokens).min(capacity as f64);
        self.last_refill = now;
    }

    /// Attempts to consume one token
    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until one token is available
    fn seconds_until_available(&self, rate: f64) -> u64 {
        let deficit = 1.0 - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            (deficit / rate).ceil() as u64
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    /// Whether the request is allowed
    pub allowed: bool,

    /// Tokens remaining after this check
    pub remaining: u32,

    /// Seconds until a token is available (429 responses)
    pub retry_after: u64,
}

/// In-process per-IP rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    capacity: u32,
    refill_rate: f64,
}

impl RateLimiter {
    /// Creates a limiter allowing `capacity` requests per `window_seconds`
    pub fn new(capacity: u32, window_seconds: u64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_rate: capacity as f64 / window_seconds as f64,
        }
    }

    /// Checks and consumes one token for a client IP
    pub fn check(&self, ip: &str) -> RateLimitStatus {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a panic mid-check; fail open
            Err(poisoned) => poisoned.into_inner(),
        };

        if buckets.len() > PRUNE_WATERMARK {
            let cutoff = unix_now().saturating_sub(WINDOW_SECONDS);
            buckets.retain(|_, b| b.last_refill >= cutoff);
        }

        let bucket = buckets
            .entry(ip.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity));

        bucket.refill(self.refill_rate, self.capacity);

        if bucket.try_consume() {
            RateLimitStatus {
                allowed: true,
                remaining: bucket.tokens.floor() as u32,
                retry_after: 0,
            }
        } else {
            RateLimitStatus {
                allowed: false,
                remaining: 0,
                retry_after: bucket.seconds_until_available(self.refill_rate),
            }
        }
    }
}

/// Rate limiting middleware
///
/// Checks the per-IP bucket before processing. Returns 429 with
/// `Retry-After` when the bucket is empty.
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(request.headers());
    let status = state.rate_limiter.check(&ip);

    if !status.allowed {
        tracing::warn!(ip = %ip, retry_after = status.retry_after, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: status.retry_after,
            message: format!(
                "Too many requests. Try again in {} seconds",
                status.retry_after
            ),
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from_str(&state.rate_limiter.capacity.to_string())
            .unwrap_or(HeaderValue::from_static("0")),
    );
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from_str(&status.remaining.to_string())
            .unwrap_or(HeaderValue::from_static("0")),
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_consume() {
        let mut bucket = TokenBucket::new(10);
        for _ in 0..10 {
            assert!(bucket.try_consume());
        }
        assert!(!bucket.try_consume());
        assert_eq!(bucket.tokens.floor() as u32, 0);
    }

    #[test]
    fn test_bucket_refill() {
        let mut bucket = TokenBucket {
            tokens: 5.0,
            last_refill: unix_now() - 10,
        };

        // 10 seconds at 1 token/sec
        bucket.refill(1.0, 100);
        assert!((bucket.tokens - 15.0).abs() < 0.1);
    }

    #[test]
    fn test_bucket_refill_capped() {
        let mut bucket = TokenBucket {
            tokens: 95.0,
            last_refill: unix_now() - 100,
        };

        bucket.refill(1.0, 100);
        assert_eq!(bucket.tokens, 100.0);
    }

    #[test]
    fn test_seconds_until_available() {
        let bucket = TokenBucket {
            tokens: 0.0,
            last_refill: unix_now(),
        };

        // Need 1 token at the production refill rate of 100/900
        let rate = REQUESTS_PER_WINDOW as f64 / WINDOW_SECONDS as f64;
        assert_eq!(bucket.seconds_until_available(rate), 9);

        let full = TokenBucket::new(10);
        assert_eq!(full.seconds_until_available(rate), 0);
    }

    #[test]
    fn test_limiter_blocks_after_capacity() {
        let limiter = RateLimiter::new(3, WINDOW_SECONDS);

        for _ in 0..3 {
            assert!(limiter.check("203.0.113.1").allowed);
        }

        let status = limiter.check("203.0.113.1");
        assert!(!status.allowed);
        assert!(status.retry_after > 0);

        // A different IP has its own bucket
        assert!(limiter.check("203.0.113.2").allowed);
    }

    #[test]
    fn test_limiter_remaining_counts_down() {
        let limiter = RateLimiter::new(5, WINDOW_SECONDS);

        assert_eq!(limiter.check("198.51.100.1").remaining, 4);
        assert_eq!(limiter.check("198.51.100.1").remaining, 3);
    }
}
