//! Public types for the leaselog API.
//!
//! This module re-exports types from the member crates with one flat
//! namespace.

// Errors
pub use leaselog_core::{Error, Result};

// Records
pub use leaselog_core::{
    CloseHeader, CloseResult, LogEntry, LogLevel, Metadata, MetadataEnvelope, PresignedUrl,
};

// Collaborator traits
pub use leaselog_core::{Delay, KeyValueStore, ObjectStorage, TokenGenerator};

// Metadata helpers
pub use leaselog_core::{normalize_metadata, normalize_serializable, safe_stringify};

// Lease lock
pub use leaselog_concurrency::{
    BackoffStrategy, Lease, LeaseGuard, LeaseLock, LeaseOptions, LeaseRefresher, RetrySchedule,
    RetryStep, TokioDelay, UuidTokenGenerator,
};

// Write serializer
pub use leaselog_concurrency::WriteSerializer;

// Log collector
pub use leaselog_collector::{
    content, retained_range, CollectorConfig, CollectorKeys, LogCollector, PassthroughSink,
    TracingSink,
};
