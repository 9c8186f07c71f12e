//! Core types for leaselog
//!
//! This crate defines the pieces every other crate builds on:
//! - Error: unified error type and [`Result`] alias
//! - Record types: [`LogEntry`], [`MetadataEnvelope`], [`CloseHeader`],
//!   [`CloseResult`], [`PresignedUrl`]
//! - Metadata normalization
//! - Collaborator traits: [`KeyValueStore`], [`ObjectStorage`],
//!   [`TokenGenerator`], [`Delay`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod metadata;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use metadata::{normalize_metadata, normalize_serializable, safe_stringify};
pub use traits::{Delay, KeyValueStore, ObjectStorage, TokenGenerator};
pub use types::{
    CloseHeader, CloseResult, LogEntry, LogLevel, Metadata, MetadataEnvelope, PresignedUrl,
};
