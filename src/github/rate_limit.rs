//! Request quota tracking.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Rate limit information from response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests left in the current window.
    pub remaining: u64,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

/// Process-wide quota state, owned by the client.
///
/// Updated after every response and consulted before every request. The
/// counter is only accurate if every call goes through the same client.
#[derive(Debug, Clone, Default)]
pub struct RateLimitContext {
    remaining: Option<u64>,
    reset_at: Option<DateTime<Utc>>,
    resume_at: Option<DateTime<Utc>>,
    total_wait: Duration,
    wait_count: u32,
}

impl RateLimitContext {
    /// Records the quota reported by a response.
    pub fn observe(&mut self, info: RateLimitInfo) {
        self.remaining = Some(info.remaining);
        self.reset_at = Some(info.reset_at);
    }

    /// Marks the budget as exhausted until `reset_at`.
    pub fn exhaust_until(&mut self, reset_at: DateTime<Utc>) {
        self.remaining = Some(0);
        self.reset_at = Some(reset_at);
    }

    /// Pauses requests until `resume_at` without touching the hourly budget.
    ///
    /// Used for `Retry-After` answers such as the secondary rate limit, where
    /// the primary window may still have plenty of requests left.
    pub fn pause_until(&mut self, resume_at: DateTime<Utc>) {
        self.resume_at = Some(resume_at);
    }

    /// Returns how long to block before the next request may be sent.
    ///
    /// A pending `Retry-After` pause is waited exactly. Otherwise the client
    /// blocks only when the last observed budget is zero and the reset lies in
    /// the future, and `margin` is added to absorb clock skew on the reset
    /// timestamp.
    #[must_use]
    pub fn wait_required(&self, now: DateTime<Utc>, margin: Duration) -> Option<Duration> {
        if let Some(resume_at) = self.resume_at.filter(|at| *at > now) {
            return (resume_at - now).to_std().ok();
        }
        if self.remaining != Some(0) {
            return None;
        }
        let reset_at = self.reset_at.filter(|at| *at > now)?;
        (reset_at - now).to_std().ok().map(|wait| wait + margin)
    }

    /// Records a completed wait; the budget is unknown until the next response.
    pub fn record_wait(&mut self, waited: Duration) {
        self.total_wait += waited;
        self.wait_count += 1;
        self.remaining = None;
        self.resume_at = None;
    }

    /// Last observed remaining budget.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Total time spent blocked on the quota.
    pub fn total_wait(&self) -> Duration {
        self.total_wait
    }

    /// Number of quota waits performed.
    pub fn wait_count(&self) -> u32 {
        self.wait_count
    }
}

/// Extracts rate limit information from API response headers.
pub fn extract_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers
        .get("x-ratelimit-remaining")?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()?;

    let reset_timestamp = headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .parse::<i64>()
        .ok()?;

    let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

    Some(RateLimitInfo {
        remaining,
        reset_at,
    })
}

/// Parses the `Retry-After` header value as seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())?
        .trim()
        .parse::<u64>()
        .ok()
}
