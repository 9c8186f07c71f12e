//! Log collector
//!
//! A bounded, sequenced log buffer that many independent collector instances
//! can append to concurrently, and whose close flushes to object storage
//! exactly once.
//!
//! ## Design
//!
//! The buffer lives entirely in the shared key-value store under the key
//! family of a mediator identifier (see [`CollectorKeys`]):
//! - Appends take no lock. The store's atomic increment hands out distinct
//!   sequence numbers; the entry at `seq - max_entries` is deleted to keep a
//!   ring buffer of the most recent `max_entries` entries.
//! - Within one instance, writes go through a [`WriteSerializer`] so they land
//!   in call order and `close()` can wait for all of them.
//! - `close()` is the only operation taking the lease lock, because the
//!   upload is the only non-idempotent side effect.
//!
//! ## Close Sequence
//!
//! ```text
//! 1. cached result (local, then shared)?     -> return it
//! 2. close already running in this process?  -> join it
//! 3. mark closed, drain queued writes, acquire close lease
//! 4.   cached result in shared store?         -> return it
//! 5.   drain again (first failure aborts)
//! 6.   read counters, envelope, entries (chunked)
//! 7.   assemble header + entry lines
//! 8.   upload to destination key
//! 9.   presign read URL
//! 10.  persist close result (DURABILITY POINT)
//! 11.  delete ephemeral keys (best effort)
//! 12. release lease; on failure in 3-10 reopen the instance
//! ```
//!
//! The lease is refreshed after step 5, after every chunk of step 6, and
//! before steps 8 and 10. A refresh that finds the lease gone fails the close
//! with `LeaseLost` instead of racing the new owner.
//!
//! Ephemeral keys are only deleted after step 10, so a failed close leaves the
//! buffer intact for a retry.

use chrono::Utc;
use leaselog_concurrency::{LeaseLock, LeaseRefresher, WriteSerializer};
use leaselog_core::{
    normalize_metadata, normalize_serializable, CloseHeader, CloseResult, Error, KeyValueStore,
    LogEntry, LogLevel, Metadata, MetadataEnvelope, ObjectStorage, Result,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::batch::{chunked_mdelete, chunked_mget_with};
use crate::config::CollectorConfig;
use crate::content;
use crate::keys::{retained_range, CollectorKeys};
use crate::sink::{forward, PassthroughSink};

/// Buffered state read back at close time
#[derive(Debug)]
struct BufferSnapshot {
    sequence: u64,
    dropped: u64,
    envelope: Option<MetadataEnvelope>,
    entry_keys: Vec<String>,
    entries: Vec<LogEntry>,
}

/// Multi-writer log buffer with exactly-once close
///
/// # Example
///
/// ```ignore
/// let collector = LogCollector::new(
///     CollectorConfig::new("logs/run-42.jsonl").with_mediator_id("run-42"),
///     store.clone(),
///     objects.clone(),
/// )?
/// .with_sink(Arc::new(TracingSink));
///
/// collector.info("started");
/// collector.log("step done", LogLevel::Debug, metadata);
///
/// let result = collector.close().await?;
/// println!("{}", result.url);
/// ```
pub struct LogCollector {
    config: CollectorConfig,
    keys: Arc<CollectorKeys>,
    store: Arc<dyn KeyValueStore>,
    objects: Arc<dyn ObjectStorage>,
    lease: LeaseLock,
    writes: WriteSerializer,
    sink: Option<Arc<dyn PassthroughSink>>,

    /// Set once closing starts; no more entries are buffered
    closed: AtomicBool,

    /// Close result known to this instance
    cached: Mutex<Option<CloseResult>>,

    /// Serializes close attempts within this process
    close_gate: tokio::sync::Mutex<()>,

    /// Completed close attempts, used to detect joining an in-flight one
    close_attempts: AtomicU64,

    /// Outcome of the most recent close attempt
    last_outcome: Mutex<Option<Result<CloseResult>>>,
}

impl std::fmt::Debug for LogCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogCollector")
            .field("mediator_id", &self.config.mediator_id())
            .field("destination_key", &self.config.destination_key)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl LogCollector {
    /// Create a collector and register the mediator's metadata envelope
    ///
    /// The registration is queued like any write: if the envelope already
    /// exists only its TTL is refreshed, so the first collector's start time
    /// and metadata win.
    ///
    /// # Errors
    /// - `InvalidConfig` for invalid configuration
    /// - `Runtime` when called outside a tokio runtime
    pub fn new(
        config: CollectorConfig,
        store: Arc<dyn KeyValueStore>,
        objects: Arc<dyn ObjectStorage>,
    ) -> Result<Self> {
        config.validate()?;
        let keys = Arc::new(CollectorKeys::new(&config.key_prefix, config.mediator_id()));
        let writes = WriteSerializer::new(keys.root().to_string())?;
        let lease = LeaseLock::new(store.clone());

        let collector = LogCollector {
            config,
            keys,
            store,
            objects,
            lease,
            writes,
            sink: None,
            closed: AtomicBool::new(false),
            cached: Mutex::new(None),
            close_gate: tokio::sync::Mutex::new(()),
            close_attempts: AtomicU64::new(0),
            last_outcome: Mutex::new(None),
        };
        collector.register_metadata()?;
        Ok(collector)
    }

    /// Forward every `log` call to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn PassthroughSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use `lease` for the close lock instead of a default one over the store
    pub fn with_lease_lock(mut self, lease: LeaseLock) -> Self {
        self.lease = lease;
        self
    }

    /// Effective configuration
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Shared buffer identity
    pub fn mediator_id(&self) -> &str {
        self.config.mediator_id()
    }

    /// Store keys of this collector's mediator
    pub fn keys(&self) -> &CollectorKeys {
        &self.keys
    }

    /// Whether this instance stopped buffering
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Queued writes that have not finished yet
    pub fn pending_writes(&self) -> usize {
        self.writes.pending()
    }

    /// Wait until every write queued so far has landed in the store
    ///
    /// Returns the first queued write failure since the last drain. `close()`
    /// drains on its own; this is for callers that want other instances to
    /// see their entries before someone else closes.
    pub async fn drain_writes(&self) -> Result<()> {
        self.writes.drain().await
    }

    fn register_metadata(&self) -> Result<()> {
        let envelope = MetadataEnvelope {
            started_at: Utc::now(),
            custom_metadata: normalize_metadata(&self.config.metadata),
        };
        let json = serde_json::to_string(&envelope)?;
        let store = self.store.clone();
        let key = self.keys.metadata.clone();
        let ttl = self.config.entry_ttl_secs;

        self.writes.enqueue(async move {
            if !store.set_if_absent(&key, &json, Some(ttl)).await? {
                store.expire(&key, ttl).await?;
            }
            Ok(())
        });
        Ok(())
    }

    // ========================================================================
    // Append
    // ========================================================================

    /// Append an entry
    ///
    /// Fire-and-forget: the call never blocks and never fails. Store errors
    /// surface from the next [`close`](Self::close). After close, entries only
    /// reach the passthrough sink.
    pub fn log(&self, message: impl Into<String>, level: LogLevel, metadata: Metadata) {
        let message = message.into();
        if let Some(sink) = &self.sink {
            forward(sink.as_ref(), level, &message, &metadata);
        }
        if self.is_closed() {
            return;
        }

        let metadata = normalize_metadata(&metadata);
        let timestamp = Utc::now();
        let store = self.store.clone();
        let keys = self.keys.clone();
        let max_entries = self.config.max_entries;
        let ttl = self.config.entry_ttl_secs;

        self.writes.enqueue(async move {
            let raw = store.increment(&keys.sequence, 1).await?;
            let sequence = u64::try_from(raw).map_err(|_| {
                Error::Corruption(format!("sequence counter '{}' is {}", keys.sequence, raw))
            })?;
            let entry = LogEntry {
                sequence,
                timestamp,
                level,
                message,
                metadata,
            };
            store
                .set(&keys.entry(sequence), &serde_json::to_string(&entry)?, Some(ttl))
                .await?;
            store.expire(&keys.sequence, ttl).await?;

            if sequence > max_entries {
                store.delete(&keys.entry(sequence - max_entries)).await?;
                store.increment(&keys.dropped, 1).await?;
                store.expire(&keys.dropped, ttl).await?;
            }

            // Another instance may have evicted this slot before the entry
            // landed; the evicting delete then missed it.
            let current = parse_counter(&keys.sequence, store.get(&keys.sequence).await?)?;
            if current >= sequence.saturating_add(max_entries) {
                store.delete(&keys.entry(sequence)).await?;
            }
            Ok(())
        });
    }

    /// Append an entry with any serializable metadata
    pub fn log_with<T: Serialize + ?Sized>(
        &self,
        message: impl Into<String>,
        level: LogLevel,
        metadata: &T,
    ) {
        self.log(message, level, normalize_serializable(metadata));
    }

    /// Append a trace entry
    pub fn trace(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Trace, Metadata::new());
    }

    /// Append a debug entry
    pub fn debug(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Debug, Metadata::new());
    }

    /// Append an info entry
    pub fn info(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Info, Metadata::new());
    }

    /// Append a warn entry
    pub fn warn(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Warn, Metadata::new());
    }

    /// Append an error entry
    pub fn error(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Error, Metadata::new());
    }

    // ========================================================================
    // Close
    // ========================================================================

    /// Flush the buffer to object storage, exactly once per mediator
    ///
    /// Idempotent: every call on any instance sharing the mediator identifier
    /// returns the same [`CloseResult`] once one has been persisted. Calls
    /// that overlap an in-flight close on this instance get its outcome.
    ///
    /// On error nothing is deleted and the instance accepts entries again, so
    /// calling `close()` later is a genuine retry.
    pub async fn close(&self) -> Result<CloseResult> {
        let local = self.cached.lock().clone();
        if let Some(result) = local {
            return Ok(result);
        }

        let seen = self.close_attempts.load(Ordering::SeqCst);
        let _gate = self.close_gate.lock().await;

        let local = self.cached.lock().clone();
        if let Some(result) = local {
            return Ok(result);
        }
        if self.close_attempts.load(Ordering::SeqCst) != seen {
            let joined = self.last_outcome.lock().clone();
            if let Some(outcome) = joined {
                return outcome;
            }
        }

        let outcome = self.close_once().await;
        if let Ok(result) = &outcome {
            *self.cached.lock() = Some(result.clone());
        }
        *self.last_outcome.lock() = Some(outcome.clone());
        self.close_attempts.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    async fn close_once(&self) -> Result<CloseResult> {
        if let Some(result) = self.read_cached_result().await? {
            debug!(mediator = self.mediator_id(), "close result already cached");
            self.closed.store(true, Ordering::SeqCst);
            return Ok(result);
        }

        self.closed.store(true, Ordering::SeqCst);
        let reopen = ReopenOnDrop::new(&self.closed);

        // Land this instance's writes before the lease clock starts
        let outcome = match self.writes.drain().await {
            Ok(()) => {
                self.lease
                    .with_lock(
                        &self.keys.close_lock,
                        &self.config.close_lease,
                        |refresher| self.flush_exclusive(refresher),
                    )
                    .await
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(_) => reopen.disarm(),
            Err(e) => {
                warn!(mediator = self.mediator_id(), error = %e, "close failed, buffer left intact")
            }
        }
        outcome
    }

    async fn flush_exclusive(&self, refresher: LeaseRefresher) -> Result<CloseResult> {
        if let Some(result) = self.read_cached_result().await? {
            debug!(
                mediator = self.mediator_id(),
                "closed by another instance while waiting for lease"
            );
            return Ok(result);
        }

        self.writes.drain().await?;
        hold_lease(&refresher).await?;

        let snapshot = self.read_buffer(&refresher).await?;
        let header = CloseHeader {
            started_at: snapshot.envelope.as_ref().map(|e| e.started_at),
            ended_at: Utc::now(),
            dropped_entry_count: snapshot.dropped,
            max_entries: self.config.max_entries,
            entry_count: snapshot.entries.len(),
            metadata: snapshot
                .envelope
                .as_ref()
                .map(|e| e.custom_metadata.clone())
                .unwrap_or_else(|| normalize_metadata(&self.config.metadata)),
        };
        let body = content::assemble(&header, &snapshot.entries)?;

        let destination = &self.config.destination_key;
        hold_lease(&refresher).await?;
        self.objects
            .write(destination, body.into_bytes(), content::object_metadata(&header))
            .await?;
        let presigned = self.objects.create_read_presigned_url(destination).await?;

        let result = CloseResult {
            key: destination.clone(),
            url: presigned.url,
            expires_at: presigned.expires_at,
            entry_count: header.entry_count,
        };
        hold_lease(&refresher).await?;
        self.store
            .set(
                &self.keys.close_result,
                &serde_json::to_string(&result)?,
                Some(self.config.close_result_ttl_secs),
            )
            .await?;
        info!(
            mediator = self.mediator_id(),
            destination = %destination,
            entries = result.entry_count,
            dropped = snapshot.dropped,
            "log flushed"
        );

        self.delete_buffer(&snapshot).await;
        Ok(result)
    }

    async fn read_cached_result(&self) -> Result<Option<CloseResult>> {
        match self.store.get(&self.keys.close_result).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn read_buffer(&self, refresher: &LeaseRefresher) -> Result<BufferSnapshot> {
        let header_keys = [
            self.keys.sequence.clone(),
            self.keys.dropped.clone(),
            self.keys.metadata.clone(),
        ];
        let mut header_values = self.store.mget(&header_keys).await?.into_iter();
        let sequence = parse_counter(&self.keys.sequence, header_values.next().flatten())?;
        let dropped = parse_counter(&self.keys.dropped, header_values.next().flatten())?;
        let envelope = header_values
            .next()
            .flatten()
            .map(|raw| serde_json::from_str::<MetadataEnvelope>(&raw))
            .transpose()?;

        let entry_keys = self
            .keys
            .entries(retained_range(sequence, self.config.max_entries));
        let raw_entries = chunked_mget_with(
            self.store.as_ref(),
            &entry_keys,
            self.config.batch_chunk_size,
            || hold_lease(refresher),
        )
        .await?;
        let mut entries = raw_entries
            .into_iter()
            .flatten()
            .map(|raw| serde_json::from_str::<LogEntry>(&raw).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.sequence);

        if entries.len() < entry_keys.len() {
            debug!(
                mediator = self.mediator_id(),
                missing = entry_keys.len() - entries.len(),
                "retained entries missing, likely expired"
            );
        }

        Ok(BufferSnapshot {
            sequence,
            dropped,
            envelope,
            entry_keys,
            entries,
        })
    }

    /// Remove the flushed buffer; the close result key is never touched
    async fn delete_buffer(&self, snapshot: &BufferSnapshot) {
        let mut keys = snapshot.entry_keys.clone();
        keys.push(self.keys.sequence.clone());
        keys.push(self.keys.dropped.clone());
        keys.push(self.keys.metadata.clone());

        match chunked_mdelete(self.store.as_ref(), &keys, self.config.batch_chunk_size).await {
            Ok(deleted) => debug!(
                mediator = self.mediator_id(),
                deleted,
                sequence = snapshot.sequence,
                "buffer deleted"
            ),
            Err(e) => warn!(
                mediator = self.mediator_id(),
                error = %e,
                "buffer cleanup failed, keys left to expire"
            ),
        }
    }
}

/// Extend the close lease, failing with `LeaseLost` if it is gone
async fn hold_lease(refresher: &LeaseRefresher) -> Result<()> {
    if refresher.refresh().await? {
        Ok(())
    } else {
        Err(Error::LeaseLost {
            name: refresher.lease().name.clone(),
        })
    }
}

/// Reopens the collector unless disarmed, including when the close future is dropped
struct ReopenOnDrop<'a> {
    closed: &'a AtomicBool,
    armed: bool,
}

impl<'a> ReopenOnDrop<'a> {
    fn new(closed: &'a AtomicBool) -> Self {
        ReopenOnDrop {
            closed,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ReopenOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.closed.store(false, Ordering::SeqCst);
        }
    }
}

fn parse_counter(key: &str, raw: Option<String>) -> Result<u64> {
    match raw {
        None => Ok(0),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| Error::Corruption(format!("counter '{}' holds '{}'", key, raw))),
    }
}
