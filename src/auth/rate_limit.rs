//! Fixed-window request limiting per client address.

use crate::store::KeyValueStore;
use std::{sync::Arc, time::Duration};
use tracing::warn;

const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit:";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
    /// The counter store could not be reached; the request is let through.
    Degraded,
}

impl RateLimitDecision {
    #[must_use]
    pub const fn forwards(self) -> bool {
        !matches!(self, Self::Limited)
    }
}

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    max_requests: i64,
    window: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests: i64::from(max_requests),
            window,
        }
    }

    /// Count one request for `client` and decide whether it may proceed.
    ///
    /// Store failures fail open: availability wins over quota enforcement when
    /// the counter store itself is down.
    pub async fn check(&self, client: &str) -> RateLimitDecision {
        let key = format!("{RATE_LIMIT_KEY_PREFIX}{client}");
        match self.store.incr_with_expiry(&key, self.window).await {
            Ok(count) if count > self.max_requests => {
                warn!(client, count, "Rate limited");
                RateLimitDecision::Limited
            }
            Ok(_) => RateLimitDecision::Allowed,
            Err(err) => {
                warn!(client, error = %err, "Rate limit store unavailable, failing open");
                RateLimitDecision::Degraded
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreError, memory::MemoryKeyValueStore};
    use async_trait::async_trait;

    struct DownStore;

    #[async_trait]
    impl KeyValueStore for DownStore {
        async fn incr_with_expiry(&self, _key: &str, _window: Duration) -> Result<i64, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn set_with_expiry(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryKeyValueStore::new()),
            10,
            Duration::from_secs(60),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn eleventh_request_in_window_is_limited() {
        let limiter = limiter();
        for _ in 0..10 {
            assert_eq!(
                limiter.check("10.0.0.1:5000").await,
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.check("10.0.0.1:5000").await,
            RateLimitDecision::Limited
        );

        // Other clients keep their own quota.
        assert_eq!(
            limiter.check("10.0.0.2:5000").await,
            RateLimitDecision::Allowed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_expiry() {
        let limiter = limiter();
        for _ in 0..11 {
            limiter.check("client").await;
        }
        assert_eq!(limiter.check("client").await, RateLimitDecision::Limited);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.check("client").await, RateLimitDecision::Allowed);
    }

    #[tokio::test]
    async fn unavailable_store_fails_open() {
        let limiter = RateLimiter::new(Arc::new(DownStore), 10, Duration::from_secs(60));
        let decision = limiter.check("client").await;
        assert_eq!(decision, RateLimitDecision::Degraded);
        assert!(decision.forwards());
        assert!(!RateLimitDecision::Limited.forwards());
    }
}
