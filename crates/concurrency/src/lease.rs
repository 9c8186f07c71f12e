//! Lease lock over a shared key-value store
//!
//! A lease is a named, TTL-bounded exclusive ownership record. It needs nothing
//! from the store beyond [`KeyValueStore`]: ownership is claimed with an atomic
//! `set_if_absent` on the lease's owner key, so at most one token can own a
//! name within the TTL window.
//!
//! ## Lifecycle
//!
//! ```text
//! acquire ──► owner key = token (ttl) ──► refresh* ──► release (delete)
//!                         │
//!                         └── never refreshed ──► expires, acquirable again
//! ```
//!
//! ## Safe release
//!
//! Release and refresh first read the owner key and only act if it still holds
//! the caller's token. A holder whose lease expired and was re-acquired by
//! someone else gets `false` and leaves the new owner alone.
//!
//! ## Usage
//!
//! ```ignore
//! let lock = LeaseLock::new(store);
//! let flushed = lock
//!     .with_lock("flush:run-1", &LeaseOptions::default(), |refresher| async move {
//!         do_slow_work().await?;
//!         refresher.refresh().await?;
//!         finish().await
//!     })
//!     .await?;
//! ```

use leaselog_core::{Delay, Error, KeyValueStore, Result, TokenGenerator};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backoff::{RetrySchedule, RetryStep, TokioDelay};
use crate::options::LeaseOptions;
use crate::token::UuidTokenGenerator;

/// Default key namespace for lease records
pub const DEFAULT_LEASE_PREFIX: &str = "lease";

/// A held lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Lease name
    pub name: String,
    /// Token proving ownership
    pub owner_token: String,
    /// TTL the lease was acquired with
    pub ttl_secs: u64,
}

struct LeaseInner {
    store: Arc<dyn KeyValueStore>,
    tokens: Arc<dyn TokenGenerator>,
    delay: Arc<dyn Delay>,
    prefix: String,
}

/// Named mutual exclusion built from key-value store primitives
///
/// Cheap to clone; clones share the same collaborators.
#[derive(Clone)]
pub struct LeaseLock {
    inner: Arc<LeaseInner>,
}

impl std::fmt::Debug for LeaseLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseLock")
            .field("prefix", &self.inner.prefix)
            .finish_non_exhaustive()
    }
}

impl LeaseLock {
    /// Create a lease lock with random UUID tokens and tokio timers
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_parts(
            store,
            Arc::new(UuidTokenGenerator),
            Arc::new(TokioDelay),
            DEFAULT_LEASE_PREFIX,
        )
    }

    /// Create a lease lock from explicit collaborators
    ///
    /// # Arguments
    /// * `store` - Shared key-value store holding the lease records
    /// * `tokens` - Owner token source
    /// * `delay` - Wait used between acquisition attempts
    /// * `prefix` - Key namespace for lease records
    pub fn with_parts(
        store: Arc<dyn KeyValueStore>,
        tokens: Arc<dyn TokenGenerator>,
        delay: Arc<dyn Delay>,
        prefix: impl Into<String>,
    ) -> Self {
        LeaseLock {
            inner: Arc::new(LeaseInner {
                store,
                tokens,
                delay,
                prefix: prefix.into(),
            }),
        }
    }

    /// Store key holding the owner token of `name`
    pub fn owner_key(&self, name: &str) -> String {
        format!("{}:{}:owner", self.inner.prefix, name)
    }

    /// Acquire `name`, retrying with backoff while someone else owns it
    ///
    /// Makes up to `options.retries + 1` attempts.
    ///
    /// # Errors
    /// - `LeaseAcquireTimeout` when every attempt found the lease owned
    /// - `InvalidConfig` for invalid options
    /// - store errors are returned as-is, without retry
    pub async fn acquire(&self, name: &str, options: &LeaseOptions) -> Result<Lease> {
        options.validate()?;
        let schedule = RetrySchedule::new(options);
        let owner_key = self.owner_key(name);
        let token = self.inner.tokens.generate();
        let mut attempt = 0u32;

        loop {
            let claimed = self
                .inner
                .store
                .set_if_absent(&owner_key, &token, Some(options.ttl_secs))
                .await?;
            if claimed {
                debug!(lease = name, attempt, ttl_secs = options.ttl_secs, "lease acquired");
                return Ok(Lease {
                    name: name.to_string(),
                    owner_token: token,
                    ttl_secs: options.ttl_secs,
                });
            }

            let jitter = schedule.sample_jitter(&mut rand::thread_rng());
            match schedule.after_failure(attempt, jitter) {
                RetryStep::Retry {
                    next_attempt,
                    delay,
                } => {
                    debug!(
                        lease = name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "lease contended, backing off"
                    );
                    self.inner.delay.sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryStep::GiveUp => {
                    warn!(lease = name, retries = options.retries, "lease acquisition timed out");
                    return Err(Error::LeaseAcquireTimeout {
                        name: name.to_string(),
                        retries: options.retries,
                    });
                }
            }
        }
    }

    /// Acquire `name` and wrap it in a guard that releases on drop
    pub async fn lock(&self, name: &str, options: &LeaseOptions) -> Result<LeaseGuard> {
        let lease = self.acquire(name, options).await?;
        Ok(LeaseGuard {
            lock: self.clone(),
            lease,
            released: false,
        })
    }

    /// Release `name` if `token` still owns it
    ///
    /// Returns `false`, without touching the store, when the lease is owned by
    /// another token or has already expired.
    pub async fn release(&self, name: &str, token: &str) -> Result<bool> {
        let owner_key = self.owner_key(name);
        if !self.is_owner(&owner_key, token).await? {
            debug!(lease = name, "release skipped, token no longer owns lease");
            return Ok(false);
        }
        self.inner.store.mdelete(&[owner_key]).await?;
        debug!(lease = name, "lease released");
        Ok(true)
    }

    /// Extend the TTL of `name` if `token` still owns it
    pub async fn refresh(&self, name: &str, token: &str, ttl_secs: u64) -> Result<bool> {
        let owner_key = self.owner_key(name);
        if !self.is_owner(&owner_key, token).await? {
            return Ok(false);
        }
        let extended = self.inner.store.expire(&owner_key, ttl_secs).await?;
        debug!(lease = name, ttl_secs, extended, "lease refreshed");
        Ok(extended)
    }

    /// Current owner token of `name`, if any
    pub async fn owner(&self, name: &str) -> Result<Option<String>> {
        self.inner.store.get(&self.owner_key(name)).await
    }

    /// Run `run_exclusive` while holding `name`
    ///
    /// The closure receives a [`LeaseRefresher`] for critical sections that may
    /// outlive the TTL. The lease is released on every exit path: after the
    /// closure returns `Ok` or `Err`, and (best effort, through the guard) if
    /// the future is dropped or the closure panics.
    ///
    /// A failed release does not replace the closure's outcome; the lease then
    /// lapses with its TTL.
    pub async fn with_lock<T, F, Fut>(
        &self,
        name: &str,
        options: &LeaseOptions,
        run_exclusive: F,
    ) -> Result<T>
    where
        F: FnOnce(LeaseRefresher) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.lock(name, options).await?;
        let outcome = run_exclusive(guard.refresher()).await;
        match guard.release().await {
            Ok(true) => {}
            Ok(false) => warn!(lease = name, "lease lost before release"),
            Err(e) => warn!(lease = name, error = %e, "lease release failed"),
        }
        outcome
    }

    async fn is_owner(&self, owner_key: &str, token: &str) -> Result<bool> {
        let current = self.inner.store.get(owner_key).await?;
        Ok(current.as_deref() == Some(token))
    }
}

/// Keeps a held lease alive from inside a critical section
#[derive(Debug, Clone)]
pub struct LeaseRefresher {
    lock: LeaseLock,
    lease: Lease,
}

impl LeaseRefresher {
    /// Extend the lease by its original TTL. `false` means it was lost.
    pub async fn refresh(&self) -> Result<bool> {
        self.lock
            .refresh(&self.lease.name, &self.lease.owner_token, self.lease.ttl_secs)
            .await
    }

    /// The lease being refreshed
    pub fn lease(&self) -> &Lease {
        &self.lease
    }
}

/// RAII handle for a held lease
///
/// Prefer [`LeaseGuard::release`]. Dropping an unreleased guard spawns a
/// release on the current tokio runtime; outside a runtime the lease simply
/// lapses with its TTL.
#[derive(Debug)]
pub struct LeaseGuard {
    lock: LeaseLock,
    lease: Lease,
    released: bool,
}

impl LeaseGuard {
    /// The held lease
    pub fn lease(&self) -> &Lease {
        &self.lease
    }

    /// A refresher bound to this lease
    pub fn refresher(&self) -> LeaseRefresher {
        LeaseRefresher {
            lock: self.lock.clone(),
            lease: self.lease.clone(),
        }
    }

    /// Extend the lease by its original TTL
    pub async fn refresh(&self) -> Result<bool> {
        self.refresher().refresh().await
    }

    /// Release the lease now
    pub async fn release(mut self) -> Result<bool> {
        let released = self
            .lock
            .release(&self.lease.name, &self.lease.owner_token)
            .await?;
        self.released = true;
        Ok(released)
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let lock = self.lock.clone();
                let lease = self.lease.clone();
                handle.spawn(async move {
                    if let Err(e) = lock.release(&lease.name, &lease.owner_token).await {
                        warn!(lease = %lease.name, error = %e, "release of dropped lease failed");
                    }
                });
            }
            Err(_) => {
                warn!(lease = %self.lease.name, "lease dropped outside a runtime, left to expire");
            }
        }
    }
}
