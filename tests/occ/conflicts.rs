//! Schedule conflict detection across room, instructor and section

use crate::common::*;
use slotguard::prelude::*;
use std::sync::Arc;
use tokio::sync::Barrier;

fn candidate() -> ScheduleCandidate {
    ScheduleCandidate {
        room: "A".into(),
        day: "Mon".into(),
        time: "9:00-10:00".into(),
        instructor: "X".into(),
        section: "S1".into(),
        exclude_id: None,
    }
}

#[tokio::test]
async fn test_each_dimension_rejects_candidate() {
    let cases = [
        (assignment("A", "9:00-10:00", "Y", "S2"), ConflictKind::Room),
        (assignment("B", "9:00-10:00", "X", "S2"), ConflictKind::Instructor),
        (assignment("B", "9:00-10:00", "Y", "S1"), ConflictKind::Section),
    ];
    for (existing, kind) in cases {
        let (scheduler, _, _) = scheduler();
        scheduler
            .create_assignment(&user(), existing, ConflictPolicy::Reject)
            .await
            .unwrap();

        let report = scheduler.check_schedule_conflict(&candidate()).await.unwrap();
        assert_eq!(report.kinds(), vec![kind]);

        let err = scheduler
            .create_assignment(&user(), assignment("A", "9:00-10:00", "X", "S1"), ConflictPolicy::Reject)
            .await
            .unwrap_err();
        match err {
            Error::ConflictDetected { report } => assert!(report.has(kind)),
            other => panic!("expected conflict, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_accepted_when_no_dimension_matches() {
    let (scheduler, _, _) = scheduler();
    // same room and instructor, other time; same time, other everything
    for existing in [
        assignment("A", "10:00-11:00", "X", "S1"),
        assignment("B", "9:00-10:00", "Y", "S2"),
    ] {
        scheduler
            .create_assignment(&user(), existing, ConflictPolicy::Reject)
            .await
            .unwrap();
    }
    let mut tuesday = assignment("A", "9:00-10:00", "X", "S1");
    tuesday.day = "Tue".into();
    scheduler
        .create_assignment(&user(), tuesday, ConflictPolicy::Reject)
        .await
        .unwrap();

    let report = scheduler.check_schedule_conflict(&candidate()).await.unwrap();
    assert!(report.is_clear());
    scheduler
        .create_assignment(&user(), assignment("A", "9:00-10:00", "X", "S1"), ConflictPolicy::Reject)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_conflict_message_names_dimensions() {
    let (scheduler, _, _) = scheduler();
    scheduler
        .create_assignment(&user(), assignment("A", "9:00-10:00", "X", "S1"), ConflictPolicy::Reject)
        .await
        .unwrap();
    let err = scheduler
        .create_assignment(&user(), assignment("A", "9:00-10:00", "X", "S1"), ConflictPolicy::Reject)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ConflictDetected");
    let message = err.user_message();
    for dimension in ["room", "instructor", "section"] {
        assert!(message.contains(dimension), "{} missing from {}", dimension, message);
    }
}

#[tokio::test]
async fn test_overlap_mode_catches_partial_overlap() {
    let store = store();
    let scheduler = Scheduler::builder()
        .store(Arc::clone(&store))
        .slot_matching(SlotMatching::Overlap)
        .build()
        .unwrap();
    scheduler
        .create_assignment(&user(), assignment("A", "9:30 AM - 10:30 AM", "Y", "S2"), ConflictPolicy::Reject)
        .await
        .unwrap();

    let report = scheduler.check_schedule_conflict(&candidate()).await.unwrap();
    assert_eq!(report.kinds(), vec![ConflictKind::Room]);

    let mut back_to_back = candidate();
    back_to_back.time = "10:30-11:30".into();
    assert!(scheduler
        .check_schedule_conflict(&back_to_back)
        .await
        .unwrap()
        .is_clear());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_creations_cannot_double_book() {
    let (scheduler, store, _) = scheduler();
    let scheduler = Arc::new(scheduler);
    let racers = 8;
    let barrier = Arc::new(Barrier::new(racers));

    let handles: Vec<_> = (0..racers)
        .map(|i| {
            let scheduler = Arc::clone(&scheduler);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                let request = assignment("A", "9:00-10:00", &format!("I{}", i), &format!("S{}", i));
                scheduler
                    .create_assignment(&user(), request, ConflictPolicy::Reject)
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert!(
                matches!(e.code(), "ConflictDetected" | "DuplicateResource"),
                "unexpected error: {}",
                e
            ),
        }
    }
    assert_eq!(created, 1);

    let active = store
        .find(&Filter::new(ResourceKind::Schedule).eq("room", "A"))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_numeric_year_does_not_hide_section_collision() {
    let (scheduler, _, _) = scheduler();
    let existing = scheduler
        .create_assignment(&user(), assignment("A", "9:00-10:00", "X", "S1"), ConflictPolicy::Reject)
        .await
        .unwrap();
    scheduler
        .update_with_version_control(
            ResourceKind::Schedule,
            &existing.id,
            existing.version,
            &Patch::new().set("year", 2),
        )
        .await
        .unwrap();

    let mut other = candidate();
    other.room = "B".into();
    other.instructor = "Y".into();
    let report = scheduler.check_schedule_conflict(&other).await.unwrap();
    assert_eq!(report.kinds(), vec![ConflictKind::Section]);

    let err = scheduler
        .create_assignment(&user(), assignment("B", "9:00-10:00", "Y", "S1"), ConflictPolicy::Reject)
        .await
        .unwrap_err();
    assert!(err.is_schedule_conflict());
}
