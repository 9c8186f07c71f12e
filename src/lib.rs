//! # Leaselog
//!
//! Distributed lease lock and idempotent, multi-writer log collector built on
//! a shared key-value store.
//!
//! Many independent processes can append to one logical log (identified by a
//! mediator id). The final "close and flush to object storage" happens
//! exactly once, however many processes attempt it and however often it is
//! retried after a failure.
//!
//! ## Quick Start
//!
//! ```ignore
//! use leaselog::prelude::*;
//!
//! let collector = LogCollector::new(
//!     CollectorConfig::new("logs/run-42.jsonl").with_max_entries(10_000),
//!     store.clone(),
//!     objects.clone(),
//! )?;
//!
//! collector.info("worker started");
//! collector.log("step finished", LogLevel::Debug, metadata);
//!
//! // Any instance sharing the mediator id may call this; one flush happens.
//! let result = collector.close().await?;
//! ```
//!
//! ## Building Blocks
//!
//! - [`LeaseLock`] - named, TTL-bounded mutual exclusion over the store
//! - [`WriteSerializer`] - in-process FIFO of asynchronous writes
//! - [`LogCollector`] - ring-buffered log with exactly-once close
//!
//! Backends are injected through [`KeyValueStore`], [`ObjectStorage`] and
//! [`TokenGenerator`].

#![warn(missing_docs)]

mod types;

pub mod prelude;

pub use types::*;
