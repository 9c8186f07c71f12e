//! Retry timing between acquisition attempts

use crate::common::*;
use leaselog::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn recording_lock(h: &Harness) -> (LeaseLock, Arc<RecordingDelay>) {
    let delay = Arc::new(RecordingDelay::new());
    let lock = LeaseLock::with_parts(
        h.store.clone(),
        Arc::new(SequentialTokens::new("owner")),
        delay.clone(),
        "lease",
    );
    (lock, delay)
}

fn millis(delays: Vec<Duration>) -> Vec<u128> {
    delays.into_iter().map(|d| d.as_millis()).collect()
}

#[tokio::test]
async fn exponential_backoff_doubles_each_wait() {
    let h = Harness::new();
    let (lock, delay) = recording_lock(&h);
    lock.acquire("job", &LeaseOptions::no_retry()).await.unwrap();

    let options = LeaseOptions::default()
        .with_retries(3)
        .with_retry_delay_ms(100)
        .with_backoff(BackoffStrategy::Exponential)
        .with_jitter_ms(0);
    let err = lock.acquire("job", &options).await.unwrap_err();

    assert_eq!(
        err,
        Error::LeaseAcquireTimeout {
            name: "job".to_string(),
            retries: 3
        }
    );
    assert_eq!(millis(delay.requested()), vec![100, 200, 400]);
}

#[tokio::test]
async fn fixed_backoff_keeps_base_delay() {
    let h = Harness::new();
    let (lock, delay) = recording_lock(&h);
    lock.acquire("job", &LeaseOptions::no_retry()).await.unwrap();

    let options = LeaseOptions::default()
        .with_retries(3)
        .with_retry_delay_ms(100)
        .with_backoff(BackoffStrategy::None)
        .with_jitter_ms(0);
    assert!(lock.acquire("job", &options).await.is_err());
    assert_eq!(millis(delay.requested()), vec![100, 100, 100]);
}

#[tokio::test]
async fn jitter_stays_within_bound() {
    let h = Harness::new();
    let (lock, delay) = recording_lock(&h);
    lock.acquire("job", &LeaseOptions::no_retry()).await.unwrap();

    let options = LeaseOptions::default()
        .with_retries(20)
        .with_retry_delay_ms(10)
        .with_backoff(BackoffStrategy::None)
        .with_jitter_ms(5);
    assert!(lock.acquire("job", &options).await.is_err());

    let waits = millis(delay.requested());
    assert_eq!(waits.len(), 20);
    assert!(waits.iter().all(|&ms| (10..=15).contains(&ms)));
}

#[tokio::test]
async fn zero_retries_never_waits() {
    let h = Harness::new();
    let (lock, delay) = recording_lock(&h);
    let first = lock.acquire("job", &LeaseOptions::no_retry()).await.unwrap();
    assert_eq!(first.owner_token, "owner-1");

    assert!(lock.acquire("job", &LeaseOptions::no_retry()).await.is_err());
    assert!(delay.requested().is_empty());
}

#[tokio::test]
async fn invalid_options_are_rejected_before_touching_the_store() {
    let h = Harness::new();
    let (lock, _delay) = recording_lock(&h);
    h.store.faults().fail_always(StoreOp::SetIfAbsent);

    let err = lock
        .acquire("job", &LeaseOptions::default().with_ttl_secs(0))
        .await
        .unwrap_err();
    assert!(err.is_config());
}
