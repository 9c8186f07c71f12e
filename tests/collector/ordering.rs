//! Entries from one instance land in call order

use crate::common::*;
use leaselog::prelude::*;

#[tokio::test]
async fn order_survives_store_latency() {
    let h = Harness::with_latency(3);
    let collector = h.collector(quick_config("dest"));
    let expected: Vec<String> = (0..50).map(|i| format!("msg-{}", i)).collect();
    for message in &expected {
        collector.info(message.clone());
    }

    collector.close().await.unwrap();

    let (_, entries) = h.content("dest");
    let messages: Vec<_> = entries.iter().map(|e| e.message.clone()).collect();
    assert_eq!(messages, expected);
    assert!(entries.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn writes_are_queued_until_drained() {
    let h = Harness::with_latency(2);
    let collector = h.collector(quick_config("dest"));
    for i in 0..5 {
        collector.info(format!("msg-{}", i));
    }
    assert!(collector.pending_writes() > 0);

    collector.drain_writes().await.unwrap();
    assert_eq!(collector.pending_writes(), 0);
    assert_eq!(
        h.store.get(&collector.keys().sequence).await.unwrap().as_deref(),
        Some("5")
    );
}

#[tokio::test]
async fn levels_and_metadata_are_kept() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest"));
    collector.warn("disk low");
    collector.log_with("request", LogLevel::Error, &json!({"status": 503, "path": "/api"}));
    collector.log_with("bare", LogLevel::Trace, &"plain value");

    collector.close().await.unwrap();

    let (_, entries) = h.content("dest");
    assert_eq!(entries[0].level, LogLevel::Warn);
    assert!(entries[0].metadata.is_empty());
    assert_eq!(entries[1].level, LogLevel::Error);
    assert_eq!(entries[1].metadata["status"], 503);
    assert_eq!(entries[1].metadata["path"], "/api");
    assert_eq!(entries[2].level, LogLevel::Trace);
    assert_eq!(entries[2].metadata["value"], "plain value");
}
