//! Rate limiter for polite querying of public geodata services.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Enforces a concurrency cap and a minimum pause between requests.
///
/// The pause runs from the moment the previous guard is dropped, so a slow
/// request still leaves `min_delay` of quiet before the next one. The first
/// acquisition never waits.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_delay: Duration,
    last_finished: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// - `max_concurrent`: maximum number of in-flight requests
    /// - `min_delay`: minimum time between the end of one request and the
    ///   start of the next
    pub fn new(max_concurrent: usize, min_delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            min_delay,
            last_finished: Arc::new(Mutex::new(None)),
        }
    }

    /// One request at a time, `min_delay` apart.
    pub fn sequential(min_delay: Duration) -> Self {
        Self::new(1, min_delay)
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait until a request may start. Holds a permit until the guard drops,
    /// and the drop marks the request as finished.
    pub async fn acquire(&self) -> RateLimitGuard {
        // The semaphore is owned by `self` and never closed.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("rate limiter semaphore closed");

        let last = *self
            .last_finished
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(prev) = last {
            let remaining = self.min_delay.saturating_sub(prev.elapsed());
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
        }

        RateLimitGuard {
            _permit: permit,
            last_finished: Arc::clone(&self.last_finished),
        }
    }
}

/// Guard that stamps the finish time and releases the permit when dropped.
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
    last_finished: Arc<Mutex<Option<Instant>>>,
}

impl Drop for RateLimitGuard {
    fn drop(&mut self) {
        let mut last = self
            .last_finished
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(Instant::now());
    }
}
