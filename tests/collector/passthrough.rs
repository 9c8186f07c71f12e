//! Every call reaches the passthrough sink, buffered or not

use crate::common::*;
use leaselog::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn sink_sees_entries_before_and_after_close() {
    let h = Harness::new();
    let sink = Arc::new(RecordingSink::default());
    let collector = h.collector(quick_config("dest")).with_sink(sink.clone());

    collector.info("buffered");
    collector.close().await.unwrap();
    collector.error("after close");

    assert_eq!(sink.messages(), vec!["buffered", "after close"]);
    assert_eq!(sink.seen.lock()[1].0, LogLevel::Error);
    assert_eq!(h.messages("dest"), vec!["buffered"]);
}

#[tokio::test]
async fn sink_is_called_synchronously() {
    let h = Harness::new();
    let sink = Arc::new(RecordingSink::default());
    let collector = h.collector(quick_config("dest")).with_sink(sink.clone());

    collector.log("now", LogLevel::Debug, Metadata::new());
    assert_eq!(sink.messages(), vec!["now"]);
}

#[tokio::test]
async fn sink_sees_entries_the_buffer_fails_to_store() {
    let h = Harness::new();
    let sink = Arc::new(RecordingSink::default());
    let collector = h.collector(quick_config("dest")).with_sink(sink.clone());
    collector.drain_writes().await.unwrap();
    h.store.faults().fail_next(StoreOp::Increment, 1);

    collector.warn("not stored");
    assert!(collector.close().await.is_err());
    assert_eq!(sink.messages(), vec!["not stored"]);
}
