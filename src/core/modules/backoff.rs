//! Exponential backoff for producers that restart a failed data source.
//!
//! ```text
//! delay[n] = min(initial * multiplier^(n-1), max_delay)
//! ```

use std::time::Duration;

/// Retry delay controller. Never gives up; the delay plateaus at `max_delay`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_delay: Duration,
    current_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    attempt: u32,
}

impl Backoff {
    /// Creates a new backoff controller.
    ///
    /// A `multiplier` at or below 1.0 yields a constant delay of `initial`.
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay: initial,
            current_delay: initial,
            max_delay: max.max(initial),
            multiplier,
            attempt: 0,
        }
    }

    /// Resets to the initial delay. Call after the data source recovered.
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay;
        self.attempt = 0;
    }

    /// Returns the delay to wait before the next attempt and advances.
    pub fn next_sleep(&mut self) -> Duration {
        let delay = self.current_delay;
        self.attempt = self.attempt.saturating_add(1);

        if self.multiplier > 1.0 {
            let next = self.current_delay.as_secs_f64() * self.multiplier;
            self.current_delay = Duration::from_secs_f64(next.min(self.max_delay.as_secs_f64()));
        }

        delay
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    /// 1s initial delay, doubling, capped at 60s.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 2.0)
    }
}
