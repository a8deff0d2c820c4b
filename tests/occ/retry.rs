//! Retry convergence and selectivity

use crate::common::*;
use slotguard::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_retry_converges_past_one_competing_writer() {
    let (scheduler, store, _) = scheduler();
    let room = seed_room(&store, "R1").await;
    let attempts = AtomicU32::new(0);

    let store_ref = &store;
    let room_id = &room.id;
    let attempts_ref = &attempts;
    let updated = scheduler
        .with_retry(|| async move {
            let current = store_ref.get(room_id).await?;
            if attempts_ref.fetch_add(1, Ordering::SeqCst) == 0 {
                // another writer lands between our read and our write
                store_ref
                    .conditional_update(room_id, current.version, &Patch::new().set("status", "closed"))
                    .await?;
            }
            store_ref
                .conditional_update(room_id, current.version, &Patch::new().set("status", "open"))
                .await
        })
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(updated.version, Version(3));
    assert_eq!(updated.str_field("status"), Some("open"));
}

#[tokio::test(start_paused = true)]
async fn test_not_found_fails_without_delay() {
    let (scheduler, store, _) = scheduler();
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let calls_ref = &calls;
    let store_ref = &store;
    let err = scheduler
        .with_retry(|| async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            store_ref.get(&RecordId::new("missing")).await
        })
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_default_backoff_schedule() {
    let store = store();
    let scheduler = Scheduler::builder()
        .store(Arc::clone(&store))
        .build()
        .unwrap();
    let room = seed_room(&store, "R1").await;
    store
        .conditional_update(&room.id, room.version, &Patch::new().set("status", "closed"))
        .await
        .unwrap();

    let start = Instant::now();
    let store_ref = &store;
    let room_ref = &room;
    let err = scheduler
        .with_retry(|| async move {
            store_ref
                .conditional_update(&room_ref.id, room_ref.version, &Patch::new().set("status", "x"))
                .await
        })
        .await
        .unwrap_err();

    assert!(err.is_version_conflict());
    // 3 attempts: waits of 100ms and 200ms between them
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(400), "elapsed {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_status_updates_all_land() {
    let store = store();
    let room = seed_room(&store, "R1").await;
    let scheduler = Arc::new(
        Scheduler::builder()
            .store(Arc::clone(&store))
            .retry_policy(fast_retry(20))
            .build()
            .unwrap(),
    );
    let writers = 6;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let scheduler = Arc::clone(&scheduler);
            let barrier = Arc::clone(&barrier);
            let id = room.id.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                scheduler
                    .update_room_status(&user(), &id, &format!("status-{}", i))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let stored = store.get(&room.id).await.unwrap();
    assert_eq!(stored.version, Version(1 + writers as u64));
}

#[tokio::test]
async fn test_schedule_conflict_is_not_retried() {
    let (scheduler, _, audit) = scheduler();
    scheduler
        .create_assignment(&user(), assignment("A", "9:00-10:00", "X", "S1"), ConflictPolicy::Reject)
        .await
        .unwrap();
    let other = scheduler
        .create_assignment(&user(), assignment("B", "9:00-10:00", "Y", "S2"), ConflictPolicy::Reject)
        .await
        .unwrap();

    let err = scheduler
        .reassign_instructor(&user(), &other.id, "X", ConflictPolicy::Reject)
        .await
        .unwrap_err();
    assert!(err.is_schedule_conflict());

    let summary = audit.last_transaction().unwrap();
    assert_eq!(summary.status, TransactionStatus::RolledBack);
    assert_eq!(summary.operation_count, 0);
}
