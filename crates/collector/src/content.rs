//! Flushed content format
//!
//! Newline-delimited JSON: one [`CloseHeader`] line followed by one
//! [`LogEntry`] line per retained entry, in sequence order.
//!
//! ```text
//! {"startedAt":"...","endedAt":"...","droppedEntryCount":1,"maxEntries":2,"entryCount":2,"metadata":{}}
//! {"sequence":2,"timestamp":"...","level":"info","message":"entry-2","metadata":{}}
//! {"sequence":3,"timestamp":"...","level":"info","message":"entry-3","metadata":{}}
//! ```

use leaselog_core::{safe_stringify, CloseHeader, Error, LogEntry, Result};
use std::collections::BTreeMap;

/// Render the header and entries as newline-delimited JSON
pub fn assemble(header: &CloseHeader, entries: &[LogEntry]) -> Result<String> {
    let mut out = serde_json::to_string(header)?;
    out.push('\n');
    for entry in entries {
        out.push_str(&serde_json::to_string(entry)?);
        out.push('\n');
    }
    Ok(out)
}

/// Parse content produced by [`assemble`]
pub fn parse(content: &str) -> Result<(CloseHeader, Vec<LogEntry>)> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header_line = lines
        .next()
        .ok_or_else(|| Error::Corruption("content has no header line".to_string()))?;
    let header: CloseHeader = serde_json::from_str(header_line)?;
    let entries = lines
        .map(|line| serde_json::from_str::<LogEntry>(line).map_err(Error::from))
        .collect::<Result<Vec<_>>>()?;
    Ok((header, entries))
}

/// Header fields as flat object metadata
pub fn object_metadata(header: &CloseHeader) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    if let Some(started_at) = header.started_at {
        metadata.insert("startedAt".to_string(), started_at.to_rfc3339());
    }
    metadata.insert("endedAt".to_string(), header.ended_at.to_rfc3339());
    metadata.insert(
        "droppedEntryCount".to_string(),
        header.dropped_entry_count.to_string(),
    );
    metadata.insert("maxEntries".to_string(), header.max_entries.to_string());
    metadata.insert("entryCount".to_string(), header.entry_count.to_string());
    metadata.insert("metadata".to_string(), safe_stringify(&header.metadata));
    metadata
}
