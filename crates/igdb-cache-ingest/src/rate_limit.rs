//! Client-side request budget shared by every in-flight page fetch

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Token bucket allowing `requests_per_second` requests per second.
///
/// The burst equals the per-second budget, so a cold limiter admits one
/// second's worth of requests at once and then paces the rest.
pub struct RequestLimiter {
    limiter: DefaultDirectRateLimiter,
    requests_per_second: u32,
}

impl RequestLimiter {
    /// A zero budget is clamped to one request per second
    pub fn per_second(requests_per_second: u32) -> Self {
        let budget = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: RateLimiter::direct(Quota::per_second(budget)),
            requests_per_second: budget.get(),
        }
    }

    /// Wait until the next request may be sent
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }
}

impl std::fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_zero_budget_is_clamped() {
        assert_eq!(RequestLimiter::per_second(0).requests_per_second(), 1);
        assert_eq!(RequestLimiter::per_second(4).requests_per_second(), 4);
    }

    #[tokio::test]
    async fn test_requests_beyond_burst_are_paced() {
        let limiter = RequestLimiter::per_second(10);
        let start = Instant::now();

        // 10 ride the burst, the next 2 wait ~100ms each
        for _ in 0..12 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
