//! Recording object storage

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use leaselog_core::{Error, ObjectStorage, PresignedUrl, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// An object as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Raw content
    pub bytes: Vec<u8>,
    /// Metadata attached at write time
    pub metadata: BTreeMap<String, String>,
}

impl StoredObject {
    /// Content as UTF-8 text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// In-process [`ObjectStorage`] that counts writes and can fail on demand
#[derive(Debug)]
pub struct MemoryObjectStorage {
    bucket: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    writes: AtomicUsize,
    failing_writes: AtomicU64,
    failing_presigns: AtomicU64,
    url_ttl_secs: i64,
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new("test-bucket")
    }
}

impl MemoryObjectStorage {
    /// Create empty storage for `bucket`
    pub fn new(bucket: impl Into<String>) -> Self {
        MemoryObjectStorage {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
            writes: AtomicUsize::new(0),
            failing_writes: AtomicU64::new(0),
            failing_presigns: AtomicU64::new(0),
            url_ttl_secs: 3600,
        }
    }

    /// Fail the next `times` writes
    pub fn fail_next_writes(&self, times: u64) {
        self.failing_writes.fetch_add(times, Ordering::SeqCst);
    }

    /// Fail the next `times` presign requests
    pub fn fail_next_presigns(&self, times: u64) {
        self.failing_presigns.fetch_add(times, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stored object at `key`
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().get(key).cloned()
    }

    fn take_failure(counter: &AtomicU64) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn write(
        &self,
        key: &str,
        bytes: Vec<u8>,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        tokio::task::yield_now().await;
        if Self::take_failure(&self.failing_writes) {
            return Err(Error::ObjectStorage(format!("injected write failure for '{}'", key)));
        }
        self.objects
            .lock()
            .insert(key.to_string(), StoredObject { bytes, metadata });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_read_presigned_url(&self, key: &str) -> Result<PresignedUrl> {
        if Self::take_failure(&self.failing_presigns) {
            return Err(Error::ObjectStorage(format!("injected presign failure for '{}'", key)));
        }
        if !self.objects.lock().contains_key(key) {
            return Err(Error::ObjectStorage(format!("no object at '{}'", key)));
        }
        let expires_at = Utc::now() + ChronoDuration::seconds(self.url_ttl_secs);
        Ok(PresignedUrl {
            url: format!(
                "memory://{}/{}?expires={}",
                self.bucket,
                key,
                expires_at.timestamp()
            ),
            expires_at,
        })
    }
}
