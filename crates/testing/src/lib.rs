//! Test support for leaselog
//!
//! In-process stand-ins for the external collaborators, used by unit and
//! integration tests across the workspace:
//! - [`MemoryStore`]: TTL-aware key-value store with fault injection
//! - [`MemoryObjectStorage`]: object storage that records writes
//! - [`SequentialTokens`]: predictable lease owner tokens
//! - [`RecordingDelay`]: a delay that records instead of sleeping

#![warn(missing_docs)]

pub mod objects;
pub mod store;

pub use objects::{MemoryObjectStorage, StoredObject};
pub use store::{FaultPlan, MemoryStore, StoreOp};

use async_trait::async_trait;
use leaselog_core::{Delay, TokenGenerator};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Tokens `"{prefix}-1"`, `"{prefix}-2"`, ...
#[derive(Debug)]
pub struct SequentialTokens {
    prefix: String,
    next: AtomicU64,
}

impl SequentialTokens {
    /// Start a sequence with the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        SequentialTokens {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl TokenGenerator for SequentialTokens {
    fn generate(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// Records requested delays and yields instead of sleeping
#[derive(Debug, Default)]
pub struct RecordingDelay {
    requested: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far
    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.requested.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Install a test-friendly tracing subscriber once per process
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
