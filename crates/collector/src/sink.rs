//! Passthrough sinks
//!
//! A sink sees every `log` call synchronously, before buffering and
//! regardless of whether the collector is closed. It is meant for local
//! observability only and never affects the buffered log.

use leaselog_core::{safe_stringify, LogLevel, Metadata};

/// Per-severity forwarding functions
///
/// Every method defaults to doing nothing, so implementors only override the
/// severities they care about.
pub trait PassthroughSink: Send + Sync {
    /// Forward a trace entry
    fn trace(&self, _message: &str, _metadata: &Metadata) {}
    /// Forward a debug entry
    fn debug(&self, _message: &str, _metadata: &Metadata) {}
    /// Forward an info entry
    fn info(&self, _message: &str, _metadata: &Metadata) {}
    /// Forward a warn entry
    fn warn(&self, _message: &str, _metadata: &Metadata) {}
    /// Forward an error entry
    fn error(&self, _message: &str, _metadata: &Metadata) {}
}

/// Dispatch to the sink method matching `level`
pub fn forward(sink: &dyn PassthroughSink, level: LogLevel, message: &str, metadata: &Metadata) {
    match level {
        LogLevel::Trace => sink.trace(message, metadata),
        LogLevel::Debug => sink.debug(message, metadata),
        LogLevel::Info => sink.info(message, metadata),
        LogLevel::Warn => sink.warn(message, metadata),
        LogLevel::Error => sink.error(message, metadata),
    }
}

/// Forwards entries into `tracing` at the matching level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl PassthroughSink for TracingSink {
    fn trace(&self, message: &str, metadata: &Metadata) {
        tracing::trace!(target: "leaselog::passthrough", metadata = %safe_stringify(metadata), "{}", message);
    }

    fn debug(&self, message: &str, metadata: &Metadata) {
        tracing::debug!(target: "leaselog::passthrough", metadata = %safe_stringify(metadata), "{}", message);
    }

    fn info(&self, message: &str, metadata: &Metadata) {
        tracing::info!(target: "leaselog::passthrough", metadata = %safe_stringify(metadata), "{}", message);
    }

    fn warn(&self, message: &str, metadata: &Metadata) {
        tracing::warn!(target: "leaselog::passthrough", metadata = %safe_stringify(metadata), "{}", message);
    }

    fn error(&self, message: &str, metadata: &Metadata) {
        tracing::error!(target: "leaselog::passthrough", metadata = %safe_stringify(metadata), "{}", message);
    }
}
