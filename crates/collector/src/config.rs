//! Collector configuration
//!
//! Validated once, when the collector is constructed. Invalid values are
//! rejected, never clamped.

use leaselog_concurrency::LeaseOptions;
use leaselog_core::{Error, Metadata, Result};
use serde::{Deserialize, Serialize};

/// Default key namespace for collector records
pub const DEFAULT_KEY_PREFIX: &str = "log-collector";

/// Default number of keys per batched read or delete
pub const DEFAULT_BATCH_CHUNK_SIZE: usize = 500;

/// Configuration for a [`LogCollector`](crate::LogCollector)
///
/// # Example
///
/// ```ignore
/// let config = CollectorConfig::new("logs/run-42.jsonl")
///     .with_mediator_id("run-42")
///     .with_max_entries(5_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectorConfig {
    /// Object storage key the closed log is written to
    pub destination_key: String,
    /// Shared buffer identity; defaults to `destination_key`
    pub mediator_id: Option<String>,
    /// Retention window of the ring buffer
    pub max_entries: u64,
    /// TTL of entries, counters and the metadata envelope
    pub entry_ttl_secs: u64,
    /// TTL of the cached close result
    pub close_result_ttl_secs: u64,
    /// Keys per batched read or delete
    pub batch_chunk_size: usize,
    /// Namespace for every store key the collector derives
    pub key_prefix: String,
    /// Custom metadata registered with the mediator
    pub metadata: Metadata,
    /// Lease options for the close lock
    pub close_lease: LeaseOptions,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            destination_key: String::new(),
            mediator_id: None,
            max_entries: 1_000,
            entry_ttl_secs: 60 * 60,
            close_result_ttl_secs: 7 * 24 * 60 * 60,
            batch_chunk_size: DEFAULT_BATCH_CHUNK_SIZE,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            metadata: Metadata::new(),
            close_lease: LeaseOptions::default().with_ttl_secs(60),
        }
    }
}

impl CollectorConfig {
    /// Default configuration writing to `destination_key`
    pub fn new(destination_key: impl Into<String>) -> Self {
        CollectorConfig {
            destination_key: destination_key.into(),
            ..Default::default()
        }
    }

    /// Share the buffer with every collector using `mediator_id`
    pub fn with_mediator_id(mut self, mediator_id: impl Into<String>) -> Self {
        self.mediator_id = Some(mediator_id.into());
        self
    }

    /// Set the retention window
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the entry TTL
    pub fn with_entry_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.entry_ttl_secs = ttl_secs;
        self
    }

    /// Set the close result TTL
    pub fn with_close_result_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.close_result_ttl_secs = ttl_secs;
        self
    }

    /// Set the batch chunk size
    pub fn with_batch_chunk_size(mut self, chunk: usize) -> Self {
        self.batch_chunk_size = chunk;
        self
    }

    /// Set the key namespace
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set custom metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the close lock options
    pub fn with_close_lease(mut self, options: LeaseOptions) -> Self {
        self.close_lease = options;
        self
    }

    /// Effective mediator identifier
    pub fn mediator_id(&self) -> &str {
        self.mediator_id.as_deref().unwrap_or(&self.destination_key)
    }

    /// Reject unusable configuration
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Result<()> {
            Err(Error::InvalidConfig(msg.to_string()))
        }

        if self.destination_key.is_empty() {
            return invalid("destinationKey must not be empty");
        }
        if self.mediator_id.as_deref() == Some("") {
            return invalid("mediatorId must not be empty");
        }
        if self.max_entries == 0 {
            return invalid("maxEntries must be a positive integer");
        }
        if self.entry_ttl_secs == 0 {
            return invalid("entryTtlSecs must be a positive integer");
        }
        if self.close_result_ttl_secs == 0 {
            return invalid("closeResultTtlSecs must be a positive integer");
        }
        if self.batch_chunk_size == 0 {
            return invalid("batchChunkSize must be a positive integer");
        }
        self.close_lease.validate()
    }
}
