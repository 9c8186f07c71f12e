//! Chunked batch reads and deletes
//!
//! Large key ranges are split into bounded batches so no single store call
//! fans out over the whole retained window.

use leaselog_core::{Error, KeyValueStore, Result};
use std::future::Future;

/// `mget` over `keys`, at most `chunk_size` keys per round trip
///
/// Results are in the same order as `keys`.
pub async fn chunked_mget(
    store: &dyn KeyValueStore,
    keys: &[String],
    chunk_size: usize,
) -> Result<Vec<Option<String>>> {
    chunked_mget_with(store, keys, chunk_size, || async { Ok(()) }).await
}

/// [`chunked_mget`] that runs `after_chunk` after every round trip
///
/// An error from `after_chunk` stops the read.
pub async fn chunked_mget_with<F, Fut>(
    store: &dyn KeyValueStore,
    keys: &[String],
    chunk_size: usize,
    mut after_chunk: F,
) -> Result<Vec<Option<String>>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if chunk_size == 0 {
        return Err(Error::InvalidConfig("batch chunk size must be positive".into()));
    }
    let mut values = Vec::with_capacity(keys.len());
    for chunk in keys.chunks(chunk_size) {
        let batch = store.mget(chunk).await?;
        if batch.len() != chunk.len() {
            return Err(Error::Store(format!(
                "mget returned {} values for {} keys",
                batch.len(),
                chunk.len()
            )));
        }
        values.extend(batch);
        after_chunk().await?;
    }
    Ok(values)
}

/// `mdelete` over `keys`, at most `chunk_size` keys per round trip
///
/// Returns how many keys existed.
pub async fn chunked_mdelete(
    store: &dyn KeyValueStore,
    keys: &[String],
    chunk_size: usize,
) -> Result<u64> {
    if chunk_size == 0 {
        return Err(Error::InvalidConfig("batch chunk size must be positive".into()));
    }
    let mut deleted = 0;
    for chunk in keys.chunks(chunk_size) {
        deleted += store.mdelete(chunk).await?;
    }
    Ok(deleted)
}
