//! Lease acquisition options

use leaselog_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// How the wait between acquisition attempts grows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// `retry_delay_ms × 2^attempt`
    #[default]
    Exponential,
    /// Constant `retry_delay_ms`
    None,
}

/// Options for acquiring a lease
///
/// # Example
///
/// ```ignore
/// let options = LeaseOptions::default()
///     .with_ttl_secs(60)
///     .with_retries(0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseOptions {
    /// Lifetime of the lease unless refreshed
    pub ttl_secs: u64,
    /// Attempts after the first one before giving up
    pub retries: u32,
    /// Base wait between attempts
    pub retry_delay_ms: u64,
    /// Growth of the wait between attempts
    pub backoff: BackoffStrategy,
    /// Upper bound of the random extra wait added to every retry
    pub jitter_ms: u64,
}

impl Default for LeaseOptions {
    fn default() -> Self {
        LeaseOptions {
            ttl_secs: 30,
            retries: 10,
            retry_delay_ms: 100,
            backoff: BackoffStrategy::Exponential,
            jitter_ms: 50,
        }
    }
}

impl LeaseOptions {
    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        LeaseOptions {
            retries: 0,
            jitter_ms: 0,
            ..Default::default()
        }
    }

    /// Set the lease TTL
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Set the retry budget
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the base retry delay
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Set the backoff strategy
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the jitter bound
    pub fn with_jitter_ms(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// Reject options that cannot describe a lease
    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(Error::InvalidConfig(
                "lease ttlSecs must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}
