//! Retry policy for upstream calls

use rand::Rng;
use std::time::Duration;

/// Outcome class of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connect/timeout/read failure, no usable response
    Network,
    /// Upstream answered with a non-success status
    Status(u16),
    /// Anything that retrying cannot fix
    Fatal,
}

impl FailureClass {
    /// Network failures, 408, 429 and every 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FailureClass::Network => true,
            FailureClass::Status(status) => matches!(status, 408 | 429 | 500..=599),
            FailureClass::Fatal => false,
        }
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay: Duration,
    /// Attempts made so far, including the one that just failed
    pub attempt: u32,
}

/// Bounded exponential backoff with uniform jitter
///
/// The delay before retry `k` (1-based) is `2^k * base_delay` plus a jitter
/// drawn uniformly from `[0, max_jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry `k`, without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    pub fn decide<R: Rng>(
        &self,
        attempt: u32,
        failure: FailureClass,
        rng: &mut R,
    ) -> RetryDecision {
        if !failure.is_transient() || attempt >= self.max_attempts {
            return RetryDecision {
                should_retry: false,
                delay: Duration::ZERO,
                attempt,
            };
        }

        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            self.max_jitter.mul_f64(rng.random::<f64>())
        };

        RetryDecision {
            should_retry: true,
            delay: self.backoff(attempt).saturating_add(jitter),
            attempt,
        }
    }
}
