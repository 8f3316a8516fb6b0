//! Retry policy for transient store failures
//!
//! Only [`StoreError::is_transient`] failures (outage, timeout) are retried.
//! `NotFound` and invalid documents fail immediately.

use super::StoreError;
use rand::Rng;
use std::time::Duration;

/// Backoff strategy between retry attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Retry immediately
    None,
    /// Same delay before every retry
    Fixed(Duration),
    /// base * 2^attempt, capped at max
    Exponential { base: Duration, max: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0-indexed), without jitter
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => *delay,
            Self::Exponential { base, max } => {
                let multiplier = 2u32.saturating_pow(attempt);
                base.saturating_mul(multiplier).min(*max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt)
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
    /// Add up to 25% random jitter to each delay
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::default(),
            jitter: true,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::None,
            jitter: false,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Whether a failure on attempt `attempt` (0-indexed) should be retried
    pub fn should_retry(&self, err: &StoreError, attempt: u32) -> bool {
        attempt < self.max_retries && err.is_transient()
    }

    /// Delay before the retry following attempt `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.backoff.delay_for_attempt(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        // 抖动: 0..=25%，避免多个客户端同时重试
        let max_jitter = (delay.as_millis() as u64) / 4;
        let jitter = rand::thread_rng().gen_range(0..=max_jitter);
        delay + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}
