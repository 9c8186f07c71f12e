//! Convenient imports for leaselog.
//!
//! ```ignore
//! use leaselog::prelude::*;
//! ```

// Main entry points
pub use crate::types::{LeaseLock, LogCollector};

// Configuration
pub use crate::types::{BackoffStrategy, CollectorConfig, LeaseOptions};

// Error handling
pub use crate::types::{Error, Result};

// Records
pub use crate::types::{CloseResult, LogEntry, LogLevel, Metadata};

// Collaborators
pub use crate::types::{KeyValueStore, ObjectStorage, PassthroughSink, TokenGenerator};

// Re-export serde_json for convenience
pub use serde_json::json;
