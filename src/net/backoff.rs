//! Exponential backoff with jitter for failed accepts.

use std::time::Duration;

use rand::Rng;

/// Backoff state for consecutive accept failures.
///
/// Each failure doubles the delay starting at `base`, capped at `max`, plus up to 10% jitter.
/// A successful accept resets it.
#[derive(Debug, Clone)]
pub struct AcceptBackoff {
    base_ms: u64,
    max_ms: u64,
    failures: u32,
}

impl AcceptBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base_ms: base.as_millis() as u64,
            max_ms: max.as_millis() as u64,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before the next accept.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);

        let exponential_base = 2u64.saturating_pow(self.failures - 1);
        let capped_delay = self.base_ms.saturating_mul(exponential_base).min(self.max_ms);

        let jitter_range = capped_delay / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped_delay + jitter)
    }

    /// Forget previous failures.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Number of failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
