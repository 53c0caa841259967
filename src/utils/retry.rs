use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff: `min(base * 2^(attempt - 1), cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub base_ms: u64,
    pub cap_ms: u64,
}

impl Backoff {
    pub const fn new(base_ms: u64, cap_ms: u64) -> Self {
        Self { base_ms, cap_ms }
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let ms = self.base_ms.saturating_mul(1u64 << exponent).min(self.cap_ms);
        Duration::from_millis(ms)
    }
}

/// Attempt bookkeeping for one retry loop. Lives only as long as the loop.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryState {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Records a failed attempt and returns the delay to wait before the next
    /// one, or `None` once the budget is spent.
    pub fn fail(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            None
        } else {
            Some(self.backoff.delay(self.attempt))
        }
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
