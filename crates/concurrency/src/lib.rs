//! Concurrency layer for leaselog
//!
//! This crate implements the coordination primitives the log collector
//! is built on:
//! - LeaseLock: named, TTL-bounded mutual exclusion over a shared store
//! - RetrySchedule: the acquire loop's backoff state machine
//! - WriteSerializer: in-process FIFO that totally orders async writes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod lease;
pub mod options;
pub mod serializer;
pub mod token;

pub use backoff::{RetrySchedule, RetryStep, TokioDelay};
pub use lease::{Lease, LeaseGuard, LeaseLock, LeaseRefresher, DEFAULT_LEASE_PREFIX};
pub use options::{BackoffStrategy, LeaseOptions};
pub use serializer::{WriteJob, WriteSerializer};
pub use token::UuidTokenGenerator;
