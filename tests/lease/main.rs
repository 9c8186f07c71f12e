//! Lease Lock Integration Tests
//!
//! Tests for leaselog's lease lock: mutual exclusion, expiry, retry timing,
//! and release on every exit path of a critical section.

#[path = "../common/mod.rs"]
mod common;

mod backoff;
mod expiry;
mod with_lock;
