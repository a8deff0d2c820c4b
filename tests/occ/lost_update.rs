//! Lost-update prevention
//!
//! Concurrent conditional updates from the same version: exactly one wins.

use crate::common::*;
use slotguard::prelude::*;
use std::sync::Arc;
use tokio::sync::Barrier;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_writers_same_version_one_wins() {
    let store = store();
    let room = seed_room(&store, "R1").await;
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["closed", "maintenance"]
        .into_iter()
        .map(|status| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let room = room.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                store
                    .conditional_update(&room.id, room.version, &Patch::new().set("status", status))
                    .await
            })
        })
        .collect();

    let mut wins = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(record) => wins.push(record),
            Err(e) => {
                assert!(e.is_version_conflict(), "unexpected error: {}", e);
                conflicts += 1;
            }
        }
    }

    assert_eq!(wins.len(), 1);
    assert_eq!(conflicts, 1);
    assert_eq!(wins[0].version, room.version.next());

    let stored = store.get(&room.id).await.unwrap();
    assert_eq!(stored, wins[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_writers_through_scheduler() {
    let store = store();
    let room = seed_room(&store, "R1").await;
    let (scheduler, _) = scheduler_over(&store);
    let scheduler = Arc::new(scheduler);
    let writers = 12;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let scheduler = Arc::clone(&scheduler);
            let barrier = Arc::clone(&barrier);
            let room = room.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                scheduler
                    .update_with_version_control(
                        ResourceKind::Room,
                        &room.id,
                        room.version,
                        &Patch::new().set("status", format!("writer-{}", i)),
                    )
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert_eq!(e.code(), "VersionConflict"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(store.get(&room.id).await.unwrap().version, Version(2));
}

#[tokio::test]
async fn test_stale_write_reports_both_versions() {
    let store = store();
    let room = seed_room(&store, "R1").await;
    store
        .conditional_update(&room.id, room.version, &Patch::new().set("status", "closed"))
        .await
        .unwrap();

    let err = store
        .conditional_update(&room.id, room.version, &Patch::new().set("status", "open"))
        .await
        .unwrap_err();
    match &err {
        Error::VersionConflict { id, expected, actual } => {
            assert_eq!(id, &room.id);
            assert_eq!(*expected, Version(1));
            assert_eq!(*actual, Version(2));
        }
        other => panic!("expected version conflict, got {:?}", other),
    }
    assert!(err.user_message().contains("Please refresh and retry."));
}
