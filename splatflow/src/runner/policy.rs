//! Polling and verification policies.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded-interval backoff for remote job status polling.
///
/// The delay for attempt `n` grows as `initial * 2^n`, capped at `max`.
/// With jitter enabled the delay lands between half and all of that
/// interval, so polling is never a tight loop and pollers of concurrent
/// runs spread out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay before the second status poll.
    pub initial: Duration,
    /// Upper bound on the poll interval.
    pub max: Duration,
    /// Whether to jitter each interval.
    pub jitter: bool,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            max: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl PollPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial interval.
    #[must_use]
    pub fn with_initial(mut self, initial: Duration) -> Self {
        self.initial = initial;
        self
    }

    /// Sets the interval cap.
    #[must_use]
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    /// Disables jitter.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// The delay to wait after poll attempt `attempt` (0-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        let delay = base.saturating_mul(2u64.saturating_pow(attempt)).min(max);

        let jittered = if self.jitter {
            let half = delay / 2;
            if half == 0 {
                delay
            } else {
                half + rand::thread_rng().gen_range(0..=half)
            }
        } else {
            delay
        };

        Duration::from_millis(jittered)
    }
}

/// Bounded retry for store reads during output verification.
///
/// Only transient store faults are retried; a definite absence is never
/// retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Delay after attempt `n` grows as `base_delay * 2^n`.
    pub base_delay: Duration,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl VerifyPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total attempt count.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// The delay to wait after failed attempt `attempt` (0-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        Duration::from_millis(base.saturating_mul(2u64.saturating_pow(attempt)))
    }
}
