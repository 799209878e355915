//! Per-client token bucket rate limiting.
//!
//! # Design Decisions
//! - Buckets are created full on first sight of a key and never removed here
//! - Refill and decrement happen under the map's entry lock, so concurrent
//!   requests for one key cannot both spend the last token
//! - The policy travels with each call and governs refill and cap for it; a
//!   client's bucket is shared by every route it calls

use std::time::Instant;

use axum::http::{HeaderMap, HeaderValue};
use dashmap::DashMap;

use crate::config::RateLimitPolicy;
use crate::observability::metrics;

pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_REPLENISH_RATE: &str = "x-ratelimit-replenish-rate";
pub const X_RATELIMIT_BURST_CAPACITY: &str = "x-ratelimit-burst-capacity";
pub const X_RATELIMIT_REQUESTED_TOKENS: &str = "x-ratelimit-requested-tokens";

/// Slack for float refill arithmetic; waiting exactly `1 / rate` seconds
/// must yield a whole token.
const TOKEN_EPSILON: f64 = 1e-6;

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Whole tokens left in the bucket after this call.
    pub remaining: u64,
    pub policy: RateLimitPolicy,
}

impl RateLimitDecision {
    /// Add the `X-RateLimit-*` headers describing this decision.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(
            X_RATELIMIT_REPLENISH_RATE,
            HeaderValue::from(self.policy.replenish_rate),
        );
        headers.insert(
            X_RATELIMIT_BURST_CAPACITY,
            HeaderValue::from(self.policy.burst_capacity),
        );
        headers.insert(X_RATELIMIT_REQUESTED_TOKENS, HeaderValue::from_static("1"));
    }
}

/// Decides whether a request identified by `key` may proceed.
///
/// Implementations must make the refill-and-decrement step atomic per key.
pub trait RateLimiter: Send + Sync + std::fmt::Debug {
    fn allow(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision;
}

/// A simple token bucket.
#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn try_acquire(&mut self, policy: RateLimitPolicy, now: Instant) -> bool {
        let capacity = f64::from(policy.burst_capacity);
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * f64::from(policy.replenish_rate)).min(capacity);
        self.last_refill = now;

        if self.tokens + TOKEN_EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            true
        } else {
            false
        }
    }
}

/// In-process token bucket store.
#[derive(Debug, Default)]
pub struct TokenBucketLimiter {
    buckets: DashMap<String, TokenBucket>,
}

impl TokenBucketLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `key` as of `now`.
    fn allow_at(&self, key: &str, policy: RateLimitPolicy, now: Instant) -> RateLimitDecision {
        let (allowed, tokens, created) = {
            let mut created = false;
            let mut bucket = self.buckets.entry(key.to_owned()).or_insert_with(|| {
                created = true;
                TokenBucket::new(f64::from(policy.burst_capacity), now)
            });
            let allowed = bucket.try_acquire(policy, now);
            (allowed, bucket.tokens, created)
        };

        if created {
            metrics::record_bucket_count(self.buckets.len());
        }

        RateLimitDecision {
            allowed,
            remaining: (tokens + TOKEN_EPSILON).floor() as u64,
            policy,
        }
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn allow(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        self.allow_at(key, policy, Instant::now())
    }
}
