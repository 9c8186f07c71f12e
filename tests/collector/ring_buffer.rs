//! Only the most recent `max_entries` entries are flushed

use crate::common::*;

#[tokio::test]
async fn oldest_entries_are_dropped() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest").with_max_entries(2));
    for i in 1..=3 {
        collector.info(format!("entry-{}", i));
    }

    let result = collector.close().await.unwrap();
    assert_eq!(result.entry_count, 2);

    let (header, entries) = h.content("dest");
    assert_eq!(header.dropped_entry_count, 1);
    assert_eq!(header.max_entries, 2);
    assert_eq!(header.entry_count, 2);
    let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["entry-2", "entry-3"]);
    assert_eq!(entries[0].sequence, 2);
}

#[tokio::test]
async fn evicted_keys_are_deleted_while_logging() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest").with_max_entries(3));
    for i in 1..=5 {
        collector.info(format!("entry-{}", i));
    }
    collector.drain_writes().await.unwrap();

    let entries = h
        .store
        .keys_with_prefix(&format!("{}:entry:", collector.keys().root()));
    assert_eq!(entries.len(), 3);
    assert!(!entries.contains(&collector.keys().entry(2)));
    assert!(entries.contains(&collector.keys().entry(5)));
}

#[tokio::test]
async fn window_larger_than_one_batch() {
    let h = Harness::new();
    let collector = h.collector(
        quick_config("dest")
            .with_max_entries(600)
            .with_batch_chunk_size(250),
    );
    for i in 1..=700 {
        collector.info(format!("entry-{}", i));
    }

    let result = collector.close().await.unwrap();
    assert_eq!(result.entry_count, 600);

    let (header, entries) = h.content("dest");
    assert_eq!(header.dropped_entry_count, 100);
    assert_eq!(entries.first().unwrap().message, "entry-101");
    assert_eq!(entries.last().unwrap().message, "entry-700");
    assert!(entries.windows(2).all(|w| w[0].sequence + 1 == w[1].sequence));
    assert!(h.store.keys_with_prefix("log-collector:dest:entry:").is_empty());
}

#[tokio::test]
async fn default_chunking_over_many_entries() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest"));
    for i in 0..1_100 {
        collector.debug(format!("entry-{}", i));
    }

    let result = collector.close().await.unwrap();
    assert_eq!(result.entry_count, 1_000);
    assert_eq!(h.content("dest").0.dropped_entry_count, 100);
}

#[tokio::test]
async fn instances_share_one_window() {
    let h = Harness::new();
    let a = h.collector(quick_config("dest").with_max_entries(3));
    let b = h.collector(quick_config("dest").with_max_entries(3));

    a.info("a-1");
    a.info("a-2");
    a.drain_writes().await.unwrap();
    b.info("b-1");
    b.info("b-2");
    b.info("b-3");

    let result = b.close().await.unwrap();
    assert_eq!(result.entry_count, 3);
    assert_eq!(h.messages("dest"), vec!["b-1", "b-2", "b-3"]);
    assert_eq!(h.content("dest").0.dropped_entry_count, 2);
}
