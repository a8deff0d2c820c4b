//! Consistent reads degrade instead of failing

use crate::common::*;
use slotguard::prelude::*;
use slotguard_concurrency::{ReadTier, SnapshotReader};

async fn updated_room(store: &MemoryStore) -> VersionedRecord {
    let room = seed_room(store, "R1").await;
    store
        .conditional_update(&room.id, room.version, &Patch::new().set("status", "closed"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_majority_fallback_without_transactions() {
    let store = store();
    let current = updated_room(&store).await;
    store.set_capabilities(StoreCapabilities {
        transactions: false,
        majority_reads: true,
    });

    let (scheduler, _) = scheduler_over(&store);
    let read = scheduler.read_consistent(&current.id).await.unwrap();
    assert_eq!(read, current);

    let (_, tier) = SnapshotReader::new(&*store)
        .read_consistent_with_tier(&current.id)
        .await
        .unwrap();
    assert_eq!(tier, ReadTier::Majority);
}

#[tokio::test]
async fn test_plain_fallback_on_standalone() {
    let store = store();
    let current = updated_room(&store).await;
    store.set_capabilities(StoreCapabilities::standalone());

    let (record, tier) = SnapshotReader::new(&*store)
        .read_consistent_with_tier(&current.id)
        .await
        .unwrap();
    assert_eq!(tier, ReadTier::Plain);
    assert_eq!(record.version, Version(2));
}

#[tokio::test]
async fn test_snapshot_when_available() {
    let store = store();
    let current = updated_room(&store).await;
    let (record, tier) = SnapshotReader::new(&*store)
        .read_consistent_with_tier(&current.id)
        .await
        .unwrap();
    assert_eq!(tier, ReadTier::Snapshot);
    assert_eq!(record, current);
}

#[tokio::test]
async fn test_missing_record_is_not_found_on_every_topology() {
    for capabilities in [
        StoreCapabilities::full(),
        StoreCapabilities::standalone(),
    ] {
        let store = store();
        store.set_capabilities(capabilities);
        let (scheduler, _) = scheduler_over(&store);
        let err = scheduler
            .read_consistent(&RecordId::new("missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
