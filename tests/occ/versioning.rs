//! Monotonic versioning
//!
//! Every successful write adds exactly one to the version; failed writes
//! leave it untouched.

use crate::common::*;
use proptest::prelude::*;
use slotguard::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    /// Write with the current version
    Fresh(String),
    /// Write with a version that is `lag` behind
    Stale(u64),
    /// Toggle the archive flag
    Archive(bool),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(Step::Fresh),
        (1u64..4).prop_map(Step::Stale),
        any::<bool>().prop_map(Step::Archive),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn version_increases_by_one_per_success(steps in proptest::collection::vec(step(), 1..30)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let store = MemoryStore::new();
            let mut current = seed_room(&store, "R1").await;
            let mut seen = vec![current.version];

            for step in steps {
                let (expected, patch) = match step {
                    Step::Fresh(status) => (current.version, Patch::new().set("status", status)),
                    Step::Stale(lag) => (
                        Version(current.version.as_u64().saturating_sub(lag)),
                        Patch::new().set("status", "stale"),
                    ),
                    Step::Archive(true) => (current.version, Patch::new().archive()),
                    Step::Archive(false) => (current.version, Patch::new().restore()),
                };

                match store.conditional_update(&current.id, expected, &patch).await {
                    Ok(next) => {
                        prop_assert_eq!(next.version, current.version.next());
                        current = next;
                    }
                    Err(e) => {
                        prop_assert!(e.is_version_conflict());
                        let stored = store.get(&current.id).await.unwrap();
                        prop_assert_eq!(stored.version, current.version);
                    }
                }
                seen.push(current.version);
            }

            prop_assert!(seen.windows(2).all(|w| w[1] >= w[0]));
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_insert_starts_at_initial_version() {
    let store = store();
    let room = seed_room(&store, "R1").await;
    assert_eq!(room.version, Version::INITIAL);
    assert_eq!(room.version, Version(1));
}

#[tokio::test]
async fn test_bookkeeping_fields_in_patch_are_ignored() {
    let store = store();
    let room = seed_room(&store, "R1").await;
    let updated = store
        .conditional_update(
            &room.id,
            room.version,
            &Patch::new().set("version", 99).set("createdAt", "yesterday"),
        )
        .await
        .unwrap();
    assert_eq!(updated.version, Version(2));
    assert_eq!(updated.field("createdAt"), room.field("createdAt"));
    assert!(updated.field("version").is_none());
}
