//! Process-wide rate-limit bookkeeping and Retry-After parsing.

use std::sync::{Arc, RwLock};

use reqwest::header::HeaderMap;

/// Last-seen rate-limit headers from any response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub remaining: u64,
    pub limit: u64,
    /// Unix timestamp at which the window resets.
    pub reset_epoch: u64,
}

/// Shared cell holding the latest rate-limit snapshot.
///
/// The transport is the sole writer; readers (the refresh-interval policy in
/// the UI layer) may poll it concurrently. Updates race under concurrent
/// calls and last-write-wins is acceptable: this is advisory telemetry, not
/// a correctness gate.
#[derive(Debug, Clone, Default)]
pub struct RateLimitCell {
    inner: Arc<RwLock<Option<RateLimitSnapshot>>>,
}

impl RateLimitCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot, if any response has carried rate-limit headers yet.
    pub fn snapshot(&self) -> Option<RateLimitSnapshot> {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `x-ratelimit-*` headers from a response. Responses without a
    /// parseable `x-ratelimit-remaining` leave the cell untouched.
    pub(crate) fn update_from_headers(&self, headers: &HeaderMap) {
        let Some(remaining) = header_u64(headers, "x-ratelimit-remaining") else {
            return;
        };
        let snapshot = RateLimitSnapshot {
            remaining,
            limit: header_u64(headers, "x-ratelimit-limit").unwrap_or(0),
            reset_epoch: header_u64(headers, "x-ratelimit-reset").unwrap_or(0),
        };
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Extract a cooldown hint in milliseconds from a `Retry-After` header.
///
/// Providers send integer seconds. Missing, non-numeric, zero, or negative
/// values yield `None` — a malformed header degrades to "no retry hint"
/// rather than failing the call.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    let seconds: i64 = raw.parse().ok()?;
    if seconds <= 0 {
        return None;
    }
    Some(seconds as u64 * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn retry_after_seconds_to_millis() {
        assert_eq!(
            parse_retry_after(&headers_with("retry-after", "60")),
            Some(60_000)
        );
        assert_eq!(
            parse_retry_after(&headers_with("retry-after", "1")),
            Some(1000)
        );
    }

    #[test]
    fn retry_after_rejects_zero_negative_and_garbage() {
        assert_eq!(parse_retry_after(&headers_with("retry-after", "0")), None);
        assert_eq!(parse_retry_after(&headers_with("retry-after", "-5")), None);
        assert_eq!(parse_retry_after(&headers_with("retry-after", "abc")), None);
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn cell_updates_from_headers() {
        let cell = RateLimitCell::new();
        assert!(cell.snapshot().is_none());

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        cell.update_from_headers(&headers);

        let snapshot = cell.snapshot().unwrap();
        assert_eq!(snapshot.remaining, 4999);
        assert_eq!(snapshot.limit, 5000);
        assert_eq!(snapshot.reset_epoch, 1_700_000_000);
    }

    #[test]
    fn cell_ignores_responses_without_remaining() {
        let cell = RateLimitCell::new();
        cell.update_from_headers(&headers_with("x-ratelimit-limit", "5000"));
        assert!(cell.snapshot().is_none());
    }
}
