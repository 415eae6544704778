//! Throttle response helpers
//!
//! Google signals throttling two ways: HTTP 429 with an optional
//! `Retry-After` header, or HTTP 403 whose error reason is
//! `rateLimitExceeded` / `userRateLimitExceeded`. Both are retried by the
//! client; every other 403 is a genuine permission failure.

use std::time::Duration;

use tracing::warn;

/// Delay used when a throttle response carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Upper bound honoured for HTTP-date `Retry-After` values (one hour)
const MAX_RETRY_AFTER_SECS: u64 = 3600;

/// Error reasons Drive uses for quota throttling on a 403
const RATE_LIMIT_REASONS: &[&str] = &["ratelimitexceeded", "userratelimitexceeded"];

/// Parses a Retry-After header value into a Duration.
///
/// The header can be either:
/// - An integer number of seconds (e.g., "30")
/// - An HTTP-date (e.g., "Fri, 31 Dec 2025 23:59:59 GMT") - parsed as seconds from now
///
/// Falls back to the default duration if parsing fails.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            let diff = target - now;
            if let Some(secs) = diff
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= MAX_RETRY_AFTER_SECS)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

/// Returns true when a 403 body carries one of Drive's throttling reasons
pub fn is_rate_limit_reason(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    RATE_LIMIT_REASONS.iter().any(|reason| lower.contains(reason))
}
