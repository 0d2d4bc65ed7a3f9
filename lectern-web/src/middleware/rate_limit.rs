use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use lectern_config::RateLimitConfig;
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;
use tracing::debug;

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    /// Seconds until the current window closes, at least 1
    Limited { retry_after: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Counting store behind the rate limiter.
///
/// The bundled implementation is process-local; deployments with several
/// instances need a shared store with TTL behind this same trait.
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Count one request for `key` against `max_requests` per window
    async fn hit(&self, key: &str, max_requests: u32, now: DateTime<Utc>) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct RateLimitCounter {
    window_start: DateTime<Utc>,
    count: u32,
}

/// Fixed-window counters keyed by identity.
///
/// A window opens with the first request of a key and lasts `window`; a
/// burst straddling two windows may admit up to twice the maximum.
pub struct InMemoryRateLimiter {
    window: TimeDelta,
    counters: Mutex<LruCache<String, RateLimitCounter>>,
}

impl InMemoryRateLimiter {
    pub fn new(window: std::time::Duration, max_tracked: usize) -> Self {
        let millis = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let capacity = NonZeroUsize::new(max_tracked).unwrap_or(NonZeroUsize::MIN);
        Self {
            window: TimeDelta::milliseconds(millis),
            counters: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window, config.max_tracked_identities)
    }

    /// Number of keys currently tracked
    pub async fn tracked(&self) -> usize {
        self.counters.lock().await.len()
    }

    fn window_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start.checked_add_signed(self.window).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[async_trait]
impl RateLimitBackend for InMemoryRateLimiter {
    async fn hit(&self, key: &str, max_requests: u32, now: DateTime<Utc>) -> RateDecision {
        let mut counters = self.counters.lock().await;

        if let Some(counter) = counters.get_mut(key) {
            let window_end = self.window_end(counter.window_start);
            if now < window_end {
                if counter.count < max_requests {
                    counter.count += 1;
                    return RateDecision::Allowed {
                        remaining: max_requests - counter.count,
                    };
                }

                let retry_after = ceil_seconds(window_end - now).max(1);
                debug!(key, retry_after, "Rate limit exceeded");
                return RateDecision::Limited { retry_after };
            }
        }

        // First request of a key, or its window has elapsed
        counters.put(
            key.to_string(),
            RateLimitCounter {
                window_start: now,
                count: 1,
            },
        );
        RateDecision::Allowed {
            remaining: max_requests.saturating_sub(1),
        }
    }
}

fn ceil_seconds(delta: TimeDelta) -> u64 {
    let millis = delta.num_milliseconds().max(0);
    u64::try_from((millis + 999) / 1000).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_sixth_request_in_window_is_limited() {
        let limiter = InMemoryRateLimiter::new(Duration::from_secs(60), 100);

        for i in 0..5 {
            let at = start() + TimeDelta::seconds(i * 5);
            assert_eq!(
                limiter.hit("K", 5, at).await,
                RateDecision::Allowed {
                    remaining: 4 - i as u32
                }
            );
        }

        let decision = limiter.hit("K", 5, start() + TimeDelta::seconds(30)).await;
        assert_eq!(decision, RateDecision::Limited { retry_after: 30 });
    }

    #[tokio::test]
    async fn test_window_restarts_after_it_elapses() {
        let limiter = InMemoryRateLimiter::new(Duration::from_secs(60), 100);
        for _ in 0..5 {
            limiter.hit("K", 5, start()).await;
        }
        assert!(!limiter.hit("K", 5, start() + TimeDelta::seconds(59)).await.is_allowed());

        let decision = limiter.hit("K", 5, start() + TimeDelta::seconds(60)).await;
        assert_eq!(decision, RateDecision::Allowed { remaining: 4 });
    }

    #[tokio::test]
    async fn test_retry_after_rounds_up_to_at_least_one() {
        let limiter = InMemoryRateLimiter::new(Duration::from_secs(60), 100);
        limiter.hit("K", 1, start()).await;

        let almost = start() + TimeDelta::milliseconds(59_900);
        assert_eq!(limiter.hit("K", 1, almost).await, RateDecision::Limited { retry_after: 1 });

        let early = start() + TimeDelta::milliseconds(100);
        assert_eq!(limiter.hit("K", 1, early).await, RateDecision::Limited { retry_after: 60 });
    }

    #[tokio::test]
    async fn test_keys_are_counted_independently() {
        let limiter = InMemoryRateLimiter::new(Duration::from_secs(60), 100);
        limiter.hit("user:a", 1, start()).await;

        assert!(!limiter.hit("user:a", 1, start()).await.is_allowed());
        assert!(limiter.hit("user:b", 1, start()).await.is_allowed());
        assert!(limiter.hit("ip:203.0.113.9", 1, start()).await.is_allowed());
    }

    #[tokio::test]
    async fn test_least_recently_seen_key_is_evicted() {
        let limiter = InMemoryRateLimiter::new(Duration::from_secs(60), 2);
        limiter.hit("a", 1, start()).await;
        limiter.hit("b", 1, start()).await;
        limiter.hit("c", 1, start()).await;

        assert_eq!(limiter.tracked().await, 2);
        // "a" was evicted, so it starts a fresh window
        assert!(limiter.hit("a", 1, start()).await.is_allowed());
    }
}
