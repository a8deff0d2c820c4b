//! Shared helpers for the OCC integration tests

#![allow(dead_code)]

use serde_json::Value;
use slotguard::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Retry policy with short delays so real-clock tests stay fast
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(10))
}

/// Store with schedule uniqueness constraints
pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_schedule_constraints())
}

/// Scheduler over `store` that keeps its audit log inspectable
pub fn scheduler_over(store: &Arc<MemoryStore>) -> (Scheduler, Arc<MemoryAuditLog>) {
    let audit = Arc::new(MemoryAuditLog::new());
    let scheduler = Scheduler::builder()
        .store(Arc::clone(store))
        .retry_policy(fast_retry(3))
        .audit_log(audit.clone())
        .build()
        .expect("valid scheduler config");
    (scheduler, audit)
}

/// Scheduler over a fresh store
pub fn scheduler() -> (Scheduler, Arc<MemoryStore>, Arc<MemoryAuditLog>) {
    let store = store();
    let (scheduler, audit) = scheduler_over(&store);
    (scheduler, store, audit)
}

pub fn user() -> UserId {
    UserId::new("registrar")
}

/// Monday assignment
pub fn assignment(room: &str, time: &str, instructor: &str, section: &str) -> AssignmentFields {
    AssignmentFields {
        room: room.into(),
        day: "Mon".into(),
        time: time.into(),
        instructor: instructor.into(),
        section: section.into(),
        course: "CS101".into(),
        year: "1".into(),
    }
}

/// Convert a JSON object into a payload
pub fn payload(value: Value) -> Payload {
    value
        .as_object()
        .expect("payload must be a JSON object")
        .clone()
        .into_iter()
        .collect()
}

pub async fn seed_room(store: &MemoryStore, name: &str) -> VersionedRecord {
    store
        .insert(
            ResourceKind::Room,
            None,
            payload(json!({"name": name, "status": "available"})),
        )
        .await
        .expect("seed room")
}
