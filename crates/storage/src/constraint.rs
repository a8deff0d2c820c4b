//! Storage-level uniqueness constraints
//!
//! The conflict detector is a fast, user-facing check, and its
//! check-then-insert sequence is racy. Uniqueness constraints enforced by
//! the store inside the write itself are the actual mutual-exclusion
//! mechanism against double-booking.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotguard_core::schedule::fields;
use slotguard_core::{ResourceKind, VersionedRecord};

/// No two matching records may share the values of `fields`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Name reported in [`slotguard_core::Error::DuplicateResource`]
    pub name: String,
    /// Collection the constraint applies to
    pub kind: ResourceKind,
    /// Fields forming the unique key
    pub fields: Vec<String>,
    /// Ignore archived records (a partial index on `archived = false`)
    pub active_only: bool,
}

impl UniqueConstraint {
    /// Build a constraint over `fields`
    pub fn new<I, F>(name: impl Into<String>, kind: ResourceKind, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
            fields: fields.into_iter().map(Into::into).collect(),
            active_only: false,
        }
    }

    /// Only enforce among non-archived records
    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// `(room, day, time)` exclusivity among active schedules
    pub fn schedule_room_slot() -> Self {
        Self::new(
            "schedule_room_slot",
            ResourceKind::Schedule,
            [fields::ROOM, fields::DAY, fields::TIME],
        )
        .active_only()
    }

    /// `(instructor, day, time)` exclusivity among active schedules
    pub fn schedule_instructor_slot() -> Self {
        Self::new(
            "schedule_instructor_slot",
            ResourceKind::Schedule,
            [fields::INSTRUCTOR, fields::DAY, fields::TIME],
        )
        .active_only()
    }

    /// Unique room names
    pub fn room_name() -> Self {
        Self::new("room_name", ResourceKind::Room, ["name"])
    }

    /// The constrained key of `record`, or `None` if it is not subject to
    /// this constraint (other kind, archived, or a key field is missing)
    pub fn key_of<'a>(&self, record: &'a VersionedRecord) -> Option<Vec<&'a Value>> {
        if record.kind != self.kind || (self.active_only && record.archived) {
            return None;
        }
        self.fields
            .iter()
            .map(|field| record.payload.get(field))
            .collect()
    }

    /// Render a key for error messages, e.g. `room=A, day=Mon`
    pub fn describe(&self, key: &[&Value]) -> String {
        self.fields
            .iter()
            .zip(key)
            .map(|(field, value)| match value {
                Value::String(s) => format!("{}={}", field, s),
                other => format!("{}={}", field, other),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use slotguard_core::{Patch, Payload, RecordId};

    fn schedule(room: &str) -> VersionedRecord {
        let mut payload = Payload::new();
        payload.insert("room".into(), json!(room));
        payload.insert("day".into(), json!("Mon"));
        payload.insert("time".into(), json!("9:00-10:00"));
        VersionedRecord::new(RecordId::generate(), ResourceKind::Schedule, payload, Utc::now())
    }

    #[test]
    fn test_key_of() {
        let c = UniqueConstraint::schedule_room_slot();
        let record = schedule("A");
        let key = c.key_of(&record).unwrap();
        assert_eq!(key, vec![&json!("A"), &json!("Mon"), &json!("9:00-10:00")]);
        assert_eq!(c.describe(&key), "room=A, day=Mon, time=9:00-10:00");
    }

    #[test]
    fn test_archived_records_exempt_from_active_only() {
        let c = UniqueConstraint::schedule_room_slot();
        let archived = schedule("A").apply(&Patch::new().archive(), Utc::now());
        assert!(c.key_of(&archived).is_none());
    }

    #[test]
    fn test_missing_field_exempt() {
        let c = UniqueConstraint::schedule_instructor_slot();
        assert!(c.key_of(&schedule("A")).is_none());
    }

    #[test]
    fn test_other_kind_exempt() {
        let c = UniqueConstraint::room_name();
        assert!(c.key_of(&schedule("A")).is_none());
    }
}
