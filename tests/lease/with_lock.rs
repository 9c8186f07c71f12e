//! Critical sections release the lease on every exit path

use crate::common::*;
use leaselog::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[tokio::test]
async fn releases_after_success() {
    let h = Harness::new();
    let lock = h.lease_lock();

    let value = lock
        .with_lock("job", &LeaseOptions::no_retry(), |refresher| async move {
            assert_eq!(refresher.lease().name, "job");
            Ok(42)
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert!(lock.owner("job").await.unwrap().is_none());
}

#[tokio::test]
async fn releases_after_failure_and_keeps_the_error() {
    let h = Harness::new();
    let lock = h.lease_lock();

    let err = lock
        .with_lock("job", &LeaseOptions::no_retry(), |_| async {
            Err::<(), _>(Error::ObjectStorage("upload failed".into()))
        })
        .await
        .unwrap_err();

    assert_eq!(err, Error::ObjectStorage("upload failed".into()));
    assert!(lock.owner("job").await.unwrap().is_none());
}

#[tokio::test]
async fn closure_does_not_run_without_the_lease() {
    let h = Harness::new();
    let lock = h.lease_lock();
    let _held = lock.acquire("job", &LeaseOptions::no_retry()).await.unwrap();

    let ran = AtomicBool::new(false);
    let err = lock
        .with_lock("job", &LeaseOptions::no_retry(), |_| async {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(err.is_lease_timeout());
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn release_failure_does_not_replace_the_outcome() {
    let h = Harness::new();
    let lock = h.lease_lock();

    let value = lock
        .with_lock("job", &LeaseOptions::no_retry(), |_| async {
            h.store.faults().fail_next(StoreOp::Get, 1);
            Ok("done")
        })
        .await
        .unwrap();

    assert_eq!(value, "done");
}

#[tokio::test(start_paused = true)]
async fn refresher_keeps_a_long_section_alive() {
    let h = Harness::new();
    let lock = h.lease_lock();
    let options = LeaseOptions::no_retry().with_ttl_secs(5);

    lock.with_lock("job", &options, |refresher| {
        let lock = lock.clone();
        async move {
            for _ in 0..3 {
                tokio::time::advance(Duration::from_secs(4)).await;
                assert!(refresher.refresh().await?);
            }
            assert!(lock.acquire("job", &LeaseOptions::no_retry()).await.is_err());
            Ok(())
        }
    })
    .await
    .unwrap();

    assert!(lock.owner("job").await.unwrap().is_none());
}

#[tokio::test]
async fn dropped_guard_releases_in_background() {
    let h = Harness::new();
    let lock = h.lease_lock();

    let guard = lock.lock("job", &LeaseOptions::no_retry()).await.unwrap();
    assert!(lock.owner("job").await.unwrap().is_some());
    drop(guard);

    for _ in 0..50 {
        if lock.owner("job").await.unwrap().is_none() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("dropped guard did not release the lease");
}

#[tokio::test]
async fn explicit_guard_release() {
    let h = Harness::new();
    let lock = h.lease_lock();

    let guard = lock.lock("job", &LeaseOptions::no_retry()).await.unwrap();
    assert!(guard.refresh().await.unwrap());
    assert!(guard.release().await.unwrap());
    assert!(lock.acquire("job", &LeaseOptions::no_retry()).await.is_ok());
}
