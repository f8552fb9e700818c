//! Per-source courtesy delay between consecutive requests.
//!
//! Requests to the same source are serialised through an async mutex and
//! spaced at least `min_interval` (plus random jitter) apart. Different
//! sources own different throttles, so cross-source requests still run in
//! parallel.

use rand::Rng;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between requests to one source.
#[derive(Debug)]
pub struct CourtesyThrottle {
    min_interval: Duration,
    jitter_ms: (u64, u64),
    last_request: Mutex<Option<Instant>>,
}

impl CourtesyThrottle {
    /// Create a throttle with the given interval and jitter range `(min, max)`.
    pub fn new(min_interval: Duration, jitter_ms: (u64, u64)) -> Self {
        Self {
            min_interval,
            jitter_ms,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until this source may be called again, then record the call.
    ///
    /// The first call never waits.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let spacing = self.min_interval + self.jitter();
            let ready_at = previous + spacing;
            if ready_at > Instant::now() {
                tracing::trace!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "courtesy delay");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn jitter(&self) -> Duration {
        let (min, max) = self.jitter_ms;
        if max == 0 || min >= max {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_request_does_not_wait() {
        let throttle = CourtesyThrottle::new(Duration::from_millis(500), (0, 0));
        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_requests_are_spaced() {
        let throttle = CourtesyThrottle::new(Duration::from_millis(500), (0, 0));
        let start = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_after_interval_elapsed() {
        let throttle = CourtesyThrottle::new(Duration::from_millis(100), (0, 0));
        throttle.acquire().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        let before = Instant::now();
        throttle.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_adds_to_interval() {
        let throttle = CourtesyThrottle::new(Duration::from_millis(100), (50, 50));
        let start = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn jitter_within_range() {
        let throttle = CourtesyThrottle::new(Duration::ZERO, (10, 20));
        for _ in 0..50 {
            let j = throttle.jitter();
            assert!(j >= Duration::from_millis(10) && j <= Duration::from_millis(20));
        }
    }
}
