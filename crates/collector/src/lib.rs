//! Log collector for leaselog
//!
//! This crate implements the multi-writer log buffer:
//! - LogCollector: append (`log`) and exactly-once `close`
//! - CollectorConfig: validated configuration
//! - CollectorKeys: the store key family of a mediator identifier
//! - Chunked batch reads/deletes and the flushed content format
//! - Passthrough sinks for local observability

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod collector;
pub mod config;
pub mod content;
pub mod keys;
pub mod sink;

pub use collector::LogCollector;
pub use config::{CollectorConfig, DEFAULT_BATCH_CHUNK_SIZE, DEFAULT_KEY_PREFIX};
pub use keys::{retained_range, CollectorKeys};
pub use sink::{PassthroughSink, TracingSink};
