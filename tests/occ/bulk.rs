//! Batches with per-item isolation

use crate::common::*;
use slotguard::prelude::*;

#[tokio::test]
async fn test_stale_third_item_fails_alone() {
    let (scheduler, store, audit) = scheduler();
    let mut rooms = Vec::new();
    for i in 1..=5 {
        rooms.push(seed_room(&store, &format!("R{}", i)).await);
    }
    // someone else touches room 3 after the caller loaded it
    store
        .conditional_update(&rooms[2].id, rooms[2].version, &Patch::new().set("status", "closed"))
        .await
        .unwrap();

    let items: Vec<_> = rooms
        .iter()
        .map(|r| StatusChange::new(r.id.clone(), r.version, "maintenance"))
        .collect();
    let report = scheduler
        .bulk_update_status(&user(), ResourceKind::Room, items)
        .await;

    assert_eq!(report.success_count(), 4);
    assert_eq!(report.failure_count(), 1);

    let failure = &report.failed[0];
    assert_eq!(failure.item.id, rooms[2].id);
    assert!(failure.error.is_version_conflict());
    assert!(failure.reason().contains(rooms[2].id.as_str()));
    assert!(failure.reason().contains("Please refresh and retry."));

    for room in &rooms[3..] {
        let stored = store.get(&room.id).await.unwrap();
        assert_eq!(stored.str_field("status"), Some("maintenance"));
        assert_eq!(stored.version, Version(2));
    }
    let untouched = store.get(&rooms[2].id).await.unwrap();
    assert_eq!(untouched.str_field("status"), Some("closed"));

    assert_eq!(report.summary.status, TransactionStatus::PartialSuccess);
    assert_eq!(report.summary.operation_count, 4);
    assert_eq!(audit.last_transaction().unwrap(), report.summary);
}

#[tokio::test]
async fn test_mixed_failure_kinds_are_all_captured() {
    let (scheduler, store, _) = scheduler();
    let room = seed_room(&store, "R1").await;
    let section = store
        .insert(ResourceKind::Section, None, payload(json!({"name": "S1"})))
        .await
        .unwrap();

    let report = scheduler
        .bulk_update_status(
            &user(),
            ResourceKind::Room,
            vec![
                StatusChange::new("missing", Version(1), "closed"),
                StatusChange::new(section.id.clone(), section.version, "closed"),
                StatusChange::new(room.id.clone(), room.version, ""),
                StatusChange::new(room.id.clone(), room.version, "closed"),
            ],
        )
        .await;

    let codes: Vec<_> = report.failed.iter().map(|f| f.error.code()).collect();
    assert_eq!(codes, vec!["NotFound", "NotFound", "ValidationError"]);
    assert_eq!(report.success_count(), 1);
    assert_eq!(report.succeeded[0].id, room.id);
}

#[tokio::test]
async fn test_custom_batch_through_run_batch() {
    let (scheduler, store, _) = scheduler();
    let names = vec!["R1".to_string(), "R2".to_string(), "R1".to_string()];
    let store_ref = &store;

    let report = scheduler
        .run_batch(
            &user(),
            "room_import",
            OperationAction::Create,
            names,
            |name: &String| {
                let name = name.clone();
                async move {
                    store_ref
                        .insert(ResourceKind::Room, None, payload(json!({"name": name})))
                        .await
                }
            },
        )
        .await;

    assert_eq!(report.success_count(), 2);
    assert_eq!(report.failed[0].item, "R1");
    assert_eq!(report.failed[0].error.code(), "DuplicateResource");
    assert_eq!(report.summary.operation_kind, "room_import");
    assert!(report
        .summary
        .operations
        .iter()
        .all(|op| op.action == OperationAction::Create));
}
