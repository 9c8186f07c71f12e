//! Collaborator traits
//!
//! The lease lock and the log collector never talk to a concrete backend.
//! They receive implementations of these traits at construction time.
//!
//! ## Key-Value Store contract
//!
//! - Keys and values are opaque strings.
//! - TTLs are whole seconds and best effort: callers only rely on a key being
//!   "eventually gone" after its TTL lapses.
//! - `increment`/`decrement` are atomic; a missing key counts as `0` and the
//!   new value is returned.
//! - `set_if_absent` is atomic: of several concurrent callers for the same
//!   absent key exactly one observes `true`.
//! - `mget` returns one slot per requested key, in request order.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::Result;
use crate::types::PresignedUrl;

/// Shared associative store with per-key TTL.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key, replacing any previous value and TTL
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()>;

    /// Write a key only if it does not exist. Returns whether the write happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<bool>;

    /// Delete a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether a key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically add `amount` and return the new value
    async fn increment(&self, key: &str, amount: i64) -> Result<i64>;

    /// Atomically subtract `amount` and return the new value
    async fn decrement(&self, key: &str, amount: i64) -> Result<i64>;

    /// Set a key's TTL. Returns whether the key existed.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool>;

    /// Read many keys in one round trip
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Delete many keys in one round trip. Returns how many existed.
    async fn mdelete(&self, keys: &[String]) -> Result<u64>;
}

/// Durable blob storage.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write an object with string metadata
    async fn write(
        &self,
        key: &str,
        bytes: Vec<u8>,
        metadata: BTreeMap<String, String>,
    ) -> Result<()>;

    /// Issue a presigned read URL for an object
    async fn create_read_presigned_url(&self, key: &str) -> Result<PresignedUrl>;
}

/// Produces unpredictable, unique lease owner tokens.
pub trait TokenGenerator: Send + Sync {
    /// Generate a fresh token
    fn generate(&self) -> String;
}

/// Suspends the caller for a duration.
///
/// Injected into the lease lock so retry backoff can be driven
/// deterministically in tests.
#[async_trait]
pub trait Delay: Send + Sync {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}
