//! A failed close leaves the buffer intact and can be retried

use crate::common::*;
use leaselog::prelude::*;

#[tokio::test]
async fn upload_failure_then_retry() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest"));
    collector.info("entry-1");
    h.objects.fail_next_writes(1);

    let err = collector.close().await.unwrap_err();
    assert!(matches!(err, Error::ObjectStorage(_)));
    assert!(err.is_retryable());
    assert!(!collector.is_closed());
    assert!(h.store.exists(&collector.keys().entry(1)).await.unwrap());
    assert!(!h.store.exists(&collector.keys().close_result).await.unwrap());
    assert!(h.store.keys_with_prefix("lease:").is_empty());

    collector.info("entry-2");
    let result = collector.close().await.unwrap();
    assert_eq!(result.entry_count, 2);
    assert_eq!(h.objects.write_count(), 1);
    assert_eq!(h.messages("dest"), vec!["entry-1", "entry-2"]);
    assert!(!h.store.exists(&collector.keys().entry(1)).await.unwrap());
}

#[tokio::test]
async fn presign_failure_then_retry() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest"));
    collector.info("entry-1");
    h.objects.fail_next_presigns(1);

    assert!(collector.close().await.is_err());
    assert!(h.store.exists(&collector.keys().entry(1)).await.unwrap());

    let result = collector.close().await.unwrap();
    assert_eq!(result.entry_count, 1);
    // No result was persisted the first time, so the retry uploads again.
    assert_eq!(h.objects.write_count(), 2);
}

#[tokio::test]
async fn persist_failure_then_retry() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest"));
    collector.info("entry-1");
    collector.drain_writes().await.unwrap();
    h.store.faults().fail_next(StoreOp::Set, 1);

    let err = collector.close().await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(h.store.exists(&collector.keys().entry(1)).await.unwrap());
    assert!(h.store.exists(&collector.keys().sequence).await.unwrap());

    let result = collector.close().await.unwrap();
    assert_eq!(result.entry_count, 1);
    assert_eq!(collector.close().await.unwrap(), result);
}

#[tokio::test]
async fn read_failure_then_retry() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest"));
    collector.info("entry-1");
    collector.drain_writes().await.unwrap();
    h.store.faults().fail_next(StoreOp::MGet, 1);

    assert!(collector.close().await.is_err());
    assert_eq!(h.objects.write_count(), 0);
    assert_eq!(collector.close().await.unwrap().entry_count, 1);
}

#[tokio::test]
async fn lease_held_elsewhere_times_out_and_reopens() {
    let h = Harness::new();
    let collector = h.collector(
        CollectorConfig::new("dest").with_close_lease(LeaseOptions::no_retry()),
    );
    collector.info("before");

    let other = h.lease_lock();
    let held = other
        .acquire(&collector.keys().close_lock, &LeaseOptions::no_retry())
        .await
        .unwrap();

    let err = collector.close().await.unwrap_err();
    assert!(err.is_lease_timeout());
    assert!(!collector.is_closed());
    assert_eq!(h.objects.write_count(), 0);

    collector.info("after");
    other
        .release(&collector.keys().close_lock, &held.owner_token)
        .await
        .unwrap();

    let result = collector.close().await.unwrap();
    assert_eq!(result.entry_count, 2);
    assert_eq!(h.messages("dest"), vec!["before", "after"]);
}

#[tokio::test]
async fn failed_outcome_is_shared_with_overlapping_callers() {
    let h = Harness::new();
    let collector = h.collector(quick_config("dest"));
    collector.info("entry");
    h.objects.fail_next_writes(1);

    let (a, b) = tokio::join!(collector.close(), collector.close());
    assert!(a.is_err());
    assert_eq!(a, b);
    assert_eq!(h.objects.write_count(), 0);

    assert!(collector.close().await.is_ok());
}

#[test]
fn construction_needs_a_runtime() {
    let h = Harness::new();
    let err = LogCollector::new(CollectorConfig::new("dest"), h.store.clone(), h.objects.clone())
        .unwrap_err();
    assert!(matches!(err, Error::Runtime(_)));
}

#[tokio::test(start_paused = true)]
async fn slow_flush_keeps_the_close_lease() {
    let h = Harness::with_latency(10);
    let config = || {
        CollectorConfig::new("dest")
            .with_batch_chunk_size(1)
            .with_close_lease(
                LeaseOptions::default()
                    .with_ttl_secs(1)
                    .with_retries(1_000)
                    .with_retry_delay_ms(100)
                    .with_backoff(BackoffStrategy::None),
            )
    };
    let a = h.collector(config());
    let b = h.collector(config());
    for i in 0..300 {
        a.info(format!("entry-{}", i));
    }
    a.drain_writes().await.unwrap();

    // Reading 300 single-key chunks takes far longer than the lease TTL
    let (from_a, from_b) = tokio::join!(a.close(), b.close());
    let from_a = from_a.unwrap();

    assert_eq!(h.objects.write_count(), 1);
    assert_eq!(from_a, from_b.unwrap());
    assert_eq!(from_a.entry_count, 300);
}
