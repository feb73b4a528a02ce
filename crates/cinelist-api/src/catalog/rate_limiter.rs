//! Catalog request pacing.

use std::time::Duration;

use tokio::time::Instant;

/// Default minimum interval between requests (~40 req/s).
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(25);

/// Spaces consecutive catalog requests at least `min_interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum interval between requests.
    min_interval: Duration,
    /// Earliest instant the next request may start.
    next_slot: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum interval.
    pub(crate) const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: None,
        }
    }

    /// Creates a limiter with the default interval (25ms).
    pub(crate) const fn default_interval() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }

    /// Waits for the next free slot and reserves the one after it.
    pub async fn acquire(&mut self) {
        if let Some(slot) = self.next_slot {
            tokio::time::sleep_until(slot).await;
        }
        self.next_slot = Instant::now().checked_add(self.min_interval);
    }
}
