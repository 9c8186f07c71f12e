//! A crashed holder's lease lapses with its TTL

use crate::common::*;
use leaselog::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn lease_expires_without_release() {
    let h = Harness::new();
    let lock = h.lease_lock();
    let options = LeaseOptions::no_retry().with_ttl_secs(2);

    let stale = lock.acquire("job", &options).await.unwrap();
    assert!(lock.acquire("job", &options).await.is_err());

    tokio::time::advance(Duration::from_secs(3)).await;
    let fresh = lock.acquire("job", &options).await.unwrap();

    // The expired holder can no longer touch the new owner's lease.
    assert!(!lock.release("job", &stale.owner_token).await.unwrap());
    assert!(!lock.refresh("job", &stale.owner_token, 30).await.unwrap());
    assert_eq!(
        lock.owner("job").await.unwrap().as_deref(),
        Some(fresh.owner_token.as_str())
    );
}

#[tokio::test(start_paused = true)]
async fn refresh_extends_ttl() {
    let h = Harness::new();
    let lock = h.lease_lock();
    let lease = lock
        .acquire("job", &LeaseOptions::no_retry().with_ttl_secs(5))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(lock.refresh("job", &lease.owner_token, 5).await.unwrap());

    tokio::time::advance(Duration::from_secs(4)).await;
    assert_eq!(
        lock.owner("job").await.unwrap().as_deref(),
        Some(lease.owner_token.as_str())
    );

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(lock.owner("job").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn owner_record_carries_ttl() {
    let h = Harness::new();
    let lock = h.lease_lock();
    lock.acquire("job", &LeaseOptions::no_retry().with_ttl_secs(12))
        .await
        .unwrap();

    assert_eq!(h.store.ttl_secs(&lock.owner_key("job")), Some(12));
}
