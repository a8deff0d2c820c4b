//! Field-level change diffs

use crate::common::*;
use slotguard::prelude::*;
use slotguard_core::diff;

#[test]
fn test_only_changed_domain_fields_reported() {
    let old = payload(json!({"name": "A", "dept": "CS", "createdAt": "2024-01-01T00:00:00Z"}));
    let new = payload(json!({"name": "B", "dept": "CS", "createdAt": "2024-06-01T00:00:00Z"}));

    let entries = diff(&old, &new);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].field, "name");
    assert_eq!(entries[0].old_value, Some(json!("A")));
    assert_eq!(entries[0].new_value, Some(json!("B")));
}

#[test]
fn test_bookkeeping_never_reported() {
    let old = payload(json!({"_id": 1, "__v": 1, "updatedAt": "t1", "created_at": "t1"}));
    let new = payload(json!({"_id": 2, "__v": 2, "updatedAt": "t2", "updated_at": "t2"}));
    assert!(diff(&old, &new).is_empty());
}

#[tokio::test]
async fn test_update_writes_change_record() {
    let (scheduler, _, audit) = scheduler();
    let created = scheduler
        .create_assignment(&user(), assignment("A", "9:00-10:00", "X", "S1"), ConflictPolicy::Reject)
        .await
        .unwrap();

    scheduler
        .update_assignment(
            &user(),
            &created.id,
            created.version,
            &Patch::new().set("room", "B").set("year", "2"),
            ConflictPolicy::Reject,
        )
        .await
        .unwrap();

    let changes = audit.changes_for(&created.id);
    assert_eq!(changes.len(), 1);
    let change = &changes[0];
    assert_eq!(change.action, OperationAction::Update);
    assert_eq!(change.user_id, user());

    let fields: Vec<_> = change.changes.iter().map(|d| d.field.as_str()).collect();
    assert_eq!(fields, vec!["room", "year"]);
    assert_eq!(change.changes[0].old_value, Some(json!("A")));

    let summary = audit.last_transaction().unwrap();
    assert_eq!(change.transaction_id, summary.id);
}
