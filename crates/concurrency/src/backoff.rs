//! Retry schedule for lease acquisition
//!
//! The acquire loop is driven by a small state machine: after a failed
//! attempt `n` the schedule answers either "wait `d`, then try attempt
//! `n + 1`" or "give up". Keeping this pure lets the timing be checked without
//! a store or a clock.
//!
//! ```text
//! attempt 0 ──fail──► Retry { 1, delay(0) } ──fail──► ... ──fail──► GiveUp
//!                                                     (attempt == retries)
//! ```

use async_trait::async_trait;
use leaselog_core::Delay;
use rand::Rng;
use std::time::Duration;

use crate::options::{BackoffStrategy, LeaseOptions};

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Wait `delay`, then make attempt number `next_attempt`
    Retry {
        /// Zero-based index of the next attempt
        next_attempt: u32,
        /// Time to wait before it
        delay: Duration,
    },
    /// Retry budget exhausted
    GiveUp,
}

/// Pure retry schedule derived from [`LeaseOptions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    retries: u32,
    retry_delay_ms: u64,
    backoff: BackoffStrategy,
    jitter_ms: u64,
}

impl RetrySchedule {
    /// Build a schedule from lease options
    pub fn new(options: &LeaseOptions) -> Self {
        RetrySchedule {
            retries: options.retries,
            retry_delay_ms: options.retry_delay_ms,
            backoff: options.backoff,
            jitter_ms: options.jitter_ms,
        }
    }

    /// Total number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Wait after failed attempt `attempt`, without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let millis = match self.backoff {
            BackoffStrategy::None => self.retry_delay_ms,
            BackoffStrategy::Exponential => 2u64
                .checked_pow(attempt)
                .and_then(|factor| self.retry_delay_ms.checked_mul(factor))
                .unwrap_or(u64::MAX),
        };
        Duration::from_millis(millis)
    }

    /// Draw a jitter sample in `0..=jitter_ms`
    pub fn sample_jitter<R: Rng>(&self, rng: &mut R) -> u64 {
        if self.jitter_ms == 0 {
            0
        } else {
            rng.gen_range(0..=self.jitter_ms)
        }
    }

    /// Transition after attempt `attempt` failed
    pub fn after_failure(&self, attempt: u32, jitter_ms: u64) -> RetryStep {
        if attempt >= self.retries {
            return RetryStep::GiveUp;
        }
        RetryStep::Retry {
            next_attempt: attempt + 1,
            delay: self
                .base_delay(attempt)
                .saturating_add(Duration::from_millis(jitter_ms)),
        }
    }
}

/// [`Delay`] backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
