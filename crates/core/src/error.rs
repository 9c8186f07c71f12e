//! Unified error types for leaselog.
//!
//! Every fallible operation in the workspace returns [`Result`]. The error is
//! `Clone` so that one outcome can be handed to several waiters (for example
//! all local callers joined onto the same in-flight close).

use thiserror::Error;

/// All leaselog errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Every acquisition attempt for a lease found it owned by someone else
    #[error("timed out acquiring lease '{name}' after {retries} retries")]
    LeaseAcquireTimeout {
        /// Lease name
        name: String,
        /// Number of retries that were attempted after the first try
        retries: u32,
    },

    /// A held lease expired or was taken over before the work finished
    #[error("lease '{name}' was lost")]
    LeaseLost {
        /// Lease name
        name: String,
    },

    /// Invalid configuration, rejected at construction time
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key-value store failure
    #[error("store error: {0}")]
    Store(String),

    /// Object storage failure
    #[error("object storage error: {0}")]
    ObjectStorage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record could not be interpreted
    #[error("corrupt record: {0}")]
    Corruption(String),

    /// No async runtime to drive background work, or the worker is gone
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Result type for leaselog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error may succeed when the whole operation is retried.
    ///
    /// I/O failures against the store or object storage are transient from
    /// the caller's point of view; configuration and corruption are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::LeaseAcquireTimeout { .. }
                | Error::LeaseLost { .. }
                | Error::Store(_)
                | Error::ObjectStorage(_)
        )
    }

    /// Check if this is a lease acquisition timeout.
    pub fn is_lease_timeout(&self) -> bool {
        matches!(self, Error::LeaseAcquireTimeout { .. })
    }

    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
