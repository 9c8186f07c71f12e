//! Store key family of one mediator
//!
//! Every collector sharing a mediator identifier derives the same names:
//!
//! ```text
//! {prefix}:{mediator}:seq            sequence counter
//! {prefix}:{mediator}:dropped        evicted entry counter
//! {prefix}:{mediator}:meta           metadata envelope
//! {prefix}:{mediator}:entry:{seq}    one log entry
//! {prefix}:{mediator}:close-result   cached close result (never deleted by close)
//! {prefix}:{mediator}:close          lease name guarding close
//! ```

use std::ops::RangeInclusive;

/// Derived key names for one mediator identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorKeys {
    root: String,
    /// Sequence counter
    pub sequence: String,
    /// Dropped entry counter
    pub dropped: String,
    /// Metadata envelope
    pub metadata: String,
    /// Cached close result
    pub close_result: String,
    /// Lease name for the close lock
    pub close_lock: String,
}

impl CollectorKeys {
    /// Derive the key family for `mediator_id` under `prefix`
    pub fn new(prefix: &str, mediator_id: &str) -> Self {
        let root = format!("{}:{}", prefix, mediator_id);
        CollectorKeys {
            sequence: format!("{}:seq", root),
            dropped: format!("{}:dropped", root),
            metadata: format!("{}:meta", root),
            close_result: format!("{}:close-result", root),
            close_lock: format!("{}:close", root),
            root,
        }
    }

    /// Common prefix of every key in the family
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Key of the entry at `sequence`
    pub fn entry(&self, sequence: u64) -> String {
        format!("{}:entry:{}", self.root, sequence)
    }

    /// Keys of all entries in `range`, in sequence order
    pub fn entries(&self, range: RangeInclusive<u64>) -> Vec<String> {
        range.map(|seq| self.entry(seq)).collect()
    }
}

/// Sequences still retained after `sequence` appends with window `max_entries`
///
/// Empty when nothing has been appended.
pub fn retained_range(sequence: u64, max_entries: u64) -> RangeInclusive<u64> {
    let start = sequence.saturating_sub(max_entries) + 1;
    start..=sequence
}
