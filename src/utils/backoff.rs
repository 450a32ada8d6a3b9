use crate::config::BackoffPolicy;
use std::time::Duration;

/// Delay schedule `initial * factor^n`, clamped to `max_delay`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    next: Duration,
    factor: u32,
    max_delay: Duration,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            next: policy.initial_delay.min(policy.max_delay),
            factor: policy.factor.max(2),
            max_delay: policy.max_delay,
            attempt: 0,
        }
    }

    /// Number of delays handed out so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current
            .checked_mul(self.factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        self.attempt += 1;
        Some(current)
    }
}
