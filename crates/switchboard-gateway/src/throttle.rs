//! Request throttling.
//!
//! Two independent limits, both enforced at request start: a maximum number
//! of requests in flight (FIFO wait queue), and a minimum gap between
//! consecutive request starts to smooth bursty fan-out fetches. A fetch may
//! be under the concurrency limit and still wait out the pacing gap.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Duration, Instant};

/// Maximum requests in flight.
pub const MAX_IN_FLIGHT: usize = 2;

/// Minimum gap between consecutive request starts.
pub const MIN_START_GAP: Duration = Duration::from_millis(150);

/// Shared request throttle.
#[derive(Debug, Clone)]
pub struct Throttle {
    slots: Arc<Semaphore>,
    // Next instant at which a request may start.
    next_start: Arc<Mutex<Instant>>,
    min_gap: Duration,
}

/// Held for the duration of one request; releases the in-flight slot on drop.
#[derive(Debug)]
pub struct ThrottlePermit {
    _slot: OwnedSemaphorePermit,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(MAX_IN_FLIGHT, MIN_START_GAP)
    }
}

impl Throttle {
    /// Create a throttle with an explicit in-flight cap and start gap.
    pub fn new(max_in_flight: usize, min_gap: Duration) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_in_flight.max(1))),
            next_start: Arc::new(Mutex::new(Instant::now())),
            min_gap,
        }
    }

    /// Wait for an in-flight slot and for the pacing gap, in FIFO order.
    ///
    /// The returned permit must be held until the request completes.
    pub async fn acquire(&self) -> ThrottlePermit {
        // Semaphore closes only on explicit close, which we never do.
        let slot = match Arc::clone(&self.slots).acquire_owned().await {
            Ok(slot) => slot,
            Err(closed) => unreachable!("throttle semaphore closed: {closed}"),
        };

        let start_at = {
            let mut next = self.next_start.lock().await;
            let target = (*next).max(Instant::now());
            *next = target + self.min_gap;
            target
        };
        tokio::time::sleep_until(start_at).await;

        ThrottlePermit { _slot: slot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn start_gap_applies_even_under_concurrency_limit() {
        let throttle = Throttle::new(2, Duration::from_millis(100));

        let t0 = Instant::now();
        let _first = throttle.acquire().await;
        // Both slots free, but the second start must still wait out the gap.
        let _second = throttle.acquire().await;
        assert!(t0.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_cap_blocks_third_request() {
        let throttle = Throttle::new(2, Duration::from_millis(0));

        let first = throttle.acquire().await;
        let _second = throttle.acquire().await;

        let pending = {
            let throttle = throttle.clone();
            tokio::spawn(async move {
                let _third = throttle.acquire().await;
            })
        };

        // Give the spawned task a chance to run; it must still be waiting.
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        drop(first);
        let joined = pending.await;
        assert!(joined.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_requests_are_paced() {
        let throttle = Throttle::new(1, Duration::from_millis(50));

        let t0 = Instant::now();
        for _ in 0..3 {
            let permit = throttle.acquire().await;
            drop(permit);
        }
        // Three starts: gaps of 50ms after the first two.
        assert!(t0.elapsed() >= Duration::from_millis(100));
    }
}
