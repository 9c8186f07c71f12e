//! TTL-aware in-process key-value store
//!
//! Expiry is measured on tokio's clock, so tests running with paused time
//! can advance past a TTL without sleeping.
//!
//! Every operation first passes through the [`FaultPlan`], which can make
//! the next N calls of a given operation fail, and an optional random latency
//! that scrambles completion order of concurrent calls.

use async_trait::async_trait;
use leaselog_core::{Error, KeyValueStore, Result};
use parking_lot::Mutex;
use rand::Rng;
use rustc_hash::FxHashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Store operations that faults can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `get`
    Get,
    /// `set`
    Set,
    /// `set_if_absent`
    SetIfAbsent,
    /// `delete`
    Delete,
    /// `exists`
    Exists,
    /// `increment`
    Increment,
    /// `decrement`
    Decrement,
    /// `expire`
    Expire,
    /// `mget`
    MGet,
    /// `mdelete`
    MDelete,
}

/// Pending injected failures, per operation
#[derive(Debug, Default)]
pub struct FaultPlan {
    remaining: Mutex<FxHashMap<StoreOp, u64>>,
}

impl FaultPlan {
    /// Fail the next `times` calls of `op`
    pub fn fail_next(&self, op: StoreOp, times: u64) {
        *self.remaining.lock().entry(op).or_insert(0) += times;
    }

    /// Fail every call of `op` until cleared
    pub fn fail_always(&self, op: StoreOp) {
        self.remaining.lock().insert(op, u64::MAX);
    }

    /// Drop all pending failures
    pub fn clear(&self) {
        self.remaining.lock().clear();
    }

    fn check(&self, op: StoreOp) -> Result<()> {
        let mut remaining = self.remaining.lock();
        match remaining.get_mut(&op) {
            Some(n) if *n > 0 => {
                if *n != u64::MAX {
                    *n -= 1;
                }
                Err(Error::Store(format!("injected {:?} failure", op)))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
struct Record {
    value: String,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-process [`KeyValueStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<FxHashMap<String, Record>>,
    faults: FaultPlan,
    max_latency_ms: Mutex<u64>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a random delay of up to `max_ms` before every operation
    pub fn with_latency(self, max_ms: u64) -> Self {
        *self.max_latency_ms.lock() = max_ms;
        self
    }

    /// Injected failures
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Remaining whole seconds of a key's TTL (rounded up)
    pub fn ttl_secs(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let data = self.data.lock();
        let record = data.get(key).filter(|r| r.is_live(now))?;
        let at = record.expires_at?;
        Some((at - now).as_secs_f64().ceil() as u64)
    }

    /// Live keys starting with `prefix`, sorted
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .data
            .lock()
            .iter()
            .filter(|(k, r)| k.starts_with(prefix) && r.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Whether the store holds no live keys
    pub fn is_empty(&self) -> bool {
        let now = Instant::now();
        !self.data.lock().values().any(|r| r.is_live(now))
    }

    async fn enter(&self, op: StoreOp) -> Result<()> {
        let max = *self.max_latency_ms.lock();
        if max > 0 {
            let wait = rand::thread_rng().gen_range(0..=max);
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        self.faults.check(op)
    }

    fn deadline(ttl_secs: Option<u64>) -> Option<Instant> {
        ttl_secs.map(|secs| Instant::now() + Duration::from_secs(secs))
    }

    fn live_value(data: &FxHashMap<String, Record>, key: &str, now: Instant) -> Option<String> {
        data.get(key)
            .filter(|r| r.is_live(now))
            .map(|r| r.value.clone())
    }

    fn add(&self, key: &str, amount: i64) -> Result<i64> {
        let now = Instant::now();
        let mut data = self.data.lock();
        let (current, expires_at) = match data.get(key).filter(|r| r.is_live(now)) {
            Some(record) => {
                let n = record.value.parse::<i64>().map_err(|_| {
                    Error::Store(format!("value at '{}' is not an integer", key))
                })?;
                (n, record.expires_at)
            }
            None => (0, None),
        };
        let next = current
            .checked_add(amount)
            .ok_or_else(|| Error::Store(format!("increment overflow at '{}'", key)))?;
        data.insert(
            key.to_string(),
            Record {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.enter(StoreOp::Get).await?;
        Ok(Self::live_value(&self.data.lock(), key, Instant::now()))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        self.enter(StoreOp::Set).await?;
        self.data.lock().insert(
            key.to_string(),
            Record {
                value: value.to_string(),
                expires_at: Self::deadline(ttl_secs),
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<bool> {
        self.enter(StoreOp::SetIfAbsent).await?;
        let now = Instant::now();
        let mut data = self.data.lock();
        if data.get(key).is_some_and(|r| r.is_live(now)) {
            return Ok(false);
        }
        data.insert(
            key.to_string(),
            Record {
                value: value.to_string(),
                expires_at: Self::deadline(ttl_secs),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.enter(StoreOp::Delete).await?;
        let now = Instant::now();
        Ok(self
            .data
            .lock()
            .remove(key)
            .is_some_and(|r| r.is_live(now)))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.enter(StoreOp::Exists).await?;
        let now = Instant::now();
        Ok(self.data.lock().get(key).is_some_and(|r| r.is_live(now)))
    }

    async fn increment(&self, key: &str, amount: i64) -> Result<i64> {
        self.enter(StoreOp::Increment).await?;
        self.add(key, amount)
    }

    async fn decrement(&self, key: &str, amount: i64) -> Result<i64> {
        self.enter(StoreOp::Decrement).await?;
        let negated = amount
            .checked_neg()
            .ok_or_else(|| Error::Store(format!("decrement overflow at '{}'", key)))?;
        self.add(key, negated)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        self.enter(StoreOp::Expire).await?;
        let now = Instant::now();
        let mut data = self.data.lock();
        match data.get_mut(key).filter(|r| r.is_live(now)) {
            Some(record) => {
                record.expires_at = Self::deadline(Some(ttl_secs));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.enter(StoreOp::MGet).await?;
        let now = Instant::now();
        let data = self.data.lock();
        Ok(keys
            .iter()
            .map(|k| Self::live_value(&data, k, now))
            .collect())
    }

    async fn mdelete(&self, keys: &[String]) -> Result<u64> {
        self.enter(StoreOp::MDelete).await?;
        let now = Instant::now();
        let mut data = self.data.lock();
        Ok(keys
            .iter()
            .filter_map(|k| data.remove(k))
            .filter(|r| r.is_live(now))
            .count() as u64)
    }
}
