//! Record types shared by the lease lock and the log collector.
//!
//! All records that cross the store or object-storage boundary serialize to
//! JSON with camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Normalized metadata attached to entries and to the collector itself.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Severity of a log entry
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very verbose diagnostics
    Trace,
    /// Debug diagnostics
    Debug,
    /// Normal operation
    #[default]
    Info,
    /// Something unexpected but recoverable
    Warn,
    /// Failure
    Error,
}

impl LogLevel {
    /// Lowercase name, as written into entries
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(Error::InvalidConfig(format!("unknown log level '{}'", other))),
        }
    }
}

/// One buffered log line.
///
/// Stored under a key derived from `(mediator_id, sequence)` and never
/// modified after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Position assigned by the shared sequence counter (starts at 1)
    pub sequence: u64,
    /// Wall-clock time at which `log` was called
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
    /// Normalized metadata
    #[serde(default)]
    pub metadata: Metadata,
}

/// Per-mediator registration written by the first collector instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEnvelope {
    /// When the first collector for this mediator was constructed
    pub started_at: DateTime<Utc>,
    /// Caller supplied metadata of that first collector
    #[serde(default)]
    pub custom_metadata: Metadata,
}

/// Leading line of flushed content, also attached as object metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseHeader {
    /// Start time from the metadata envelope, if it was still present
    pub started_at: Option<DateTime<Utc>>,
    /// Time the flush was assembled
    pub ended_at: DateTime<Utc>,
    /// Entries evicted by the ring buffer
    pub dropped_entry_count: u64,
    /// Retention window size
    pub max_entries: u64,
    /// Entries present in the flushed content
    pub entry_count: usize,
    /// Custom metadata from the envelope
    #[serde(default)]
    pub metadata: Metadata,
}

/// Presigned read access to a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrl {
    /// URL granting read access
    pub url: String,
    /// When the URL stops working
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a successful close.
///
/// Once persisted under the mediator's cache key this is the answer to every
/// later `close()` on any instance sharing the mediator identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResult {
    /// Object storage key the content was written to
    pub key: String,
    /// Presigned read URL
    pub url: String,
    /// Expiry of `url`
    pub expires_at: DateTime<Utc>,
    /// Number of entries in the flushed content
    pub entry_count: usize,
}
