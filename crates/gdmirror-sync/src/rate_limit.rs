//! Client-side rate limiting for remote drive calls
//!
//! A single token bucket shared by every component that talks to the remote
//! drive. The bucket holds at most `capacity` tokens and refills continuously
//! at `capacity` tokens per second, so bursts are bounded by the capacity and
//! the steady-state rate is `capacity` calls per second.
//!
//! Refill is computed lazily from elapsed time on each acquisition; there is
//! no background timer.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gdmirror_sync::rate_limit::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::new(100));
//! limiter.acquire().await;
//! // ... make one remote call ...
//! # }
//! ```

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use tracing::{debug, trace};

/// Internal mutable state for the token bucket, protected by a Mutex.
#[derive(Debug)]
struct TokenBucketInner {
    /// Current number of available tokens (fractional for smooth refill)
    tokens: f64,
    /// Timestamp of the last refill calculation
    last_refill: Instant,
}

/// Token bucket with continuous refill.
///
/// Thread safety is provided by an internal `Mutex<TokenBucketInner>`.
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum number of tokens in the bucket
    capacity: u32,
    /// Rate at which tokens are added (tokens per second)
    refill_rate: f64,
    /// Mutable inner state (tokens count, last refill time)
    inner: Mutex<TokenBucketInner>,
}

impl TokenBucket {
    /// Creates a new `TokenBucket`. The bucket starts full.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of tokens
    /// * `refill_rate` - Tokens added per second
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            inner: Mutex::new(TokenBucketInner {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Adds the tokens accrued since the last refill, capped at capacity.
    fn refill(inner: &mut TokenBucketInner, refill_rate: f64, capacity: u32) {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(inner.last_refill).as_secs_f64();

        if elapsed_secs > 0.0 {
            inner.tokens = (inner.tokens + elapsed_secs * refill_rate).min(capacity as f64);
            inner.last_refill = now;
        }
    }

    /// Attempts to take a single token without waiting.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, self.capacity);

        if inner.tokens >= 1.0 {
            inner.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Returns the estimated wait in seconds until one token is available.
    pub fn time_until_available(&self) -> f64 {
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, self.capacity);

        if inner.tokens >= 1.0 {
            0.0
        } else if self.refill_rate > 0.0 {
            (1.0 - inner.tokens) / self.refill_rate
        } else {
            f64::MAX
        }
    }

    /// Returns the current number of available tokens (after refill).
    pub fn available_tokens(&self) -> f64 {
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, self.capacity);
        inner.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// Process-wide limiter handed to every caller that issues remote calls.
///
/// Designed to be shared via `Arc<RateLimiter>`; tests construct their own
/// instances with small capacities.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: TokenBucket,
}

impl RateLimiter {
    /// Creates a limiter allowing bursts of `capacity` calls and
    /// `capacity` calls per second sustained. A zero capacity is raised to 1.
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            bucket: TokenBucket::new(capacity, capacity as f64),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.bucket.capacity()
    }

    pub fn available_tokens(&self) -> f64 {
        self.bucket.available_tokens()
    }

    /// Waits until a token is available, then consumes it.
    ///
    /// Yields to the tokio runtime while waiting; never busy-spins.
    pub async fn acquire(&self) {
        loop {
            if self.bucket.try_acquire() {
                trace!("Rate limit token acquired");
                return;
            }

            let wait = Duration::from_secs_f64(self.bucket.time_until_available().max(0.01));
            debug!(
                wait_ms = wait.as_millis() as u64,
                "No tokens available, waiting for refill"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Acquires `min(n, capacity)` tokens one after the other.
    pub async fn acquire_burst(&self, n: u32) {
        let count = n.min(self.capacity());
        for _ in 0..count {
            self.acquire().await;
        }
    }
}
