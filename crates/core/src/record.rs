//! Versioned records and patches
//!
//! A [`VersionedRecord`] is the unit every backend stores: an id, the
//! resource kind, an optimistic concurrency [`Version`], a soft-delete flag,
//! and an ordered field map ([`Payload`]).
//!
//! Writes are expressed as a [`Patch`]. [`VersionedRecord::apply`] is the one
//! place that turns "record at version v + patch" into "record at version
//! v+1", so every backend bumps versions and stamps bookkeeping fields the
//! same way.

use crate::types::{RecordId, ResourceKind, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered mapping of field name to value
pub type Payload = BTreeMap<String, Value>;

/// Bookkeeping field stamped on insert
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Bookkeeping field stamped on every write
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Fields that carry storage bookkeeping rather than domain data
///
/// Excluded from diffs and never settable through a [`Patch`].
pub const BOOKKEEPING_FIELDS: &[&str] = &[
    "id",
    "_id",
    "version",
    "__v",
    CREATED_AT_FIELD,
    UPDATED_AT_FIELD,
    "created_at",
    "updated_at",
];

/// Whether `field` is a bookkeeping field
pub fn is_bookkeeping_field(field: &str) -> bool {
    BOOKKEEPING_FIELDS.contains(&field)
}

/// A stored entity of any resource kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    /// Record identifier
    pub id: RecordId,
    /// Collection the record belongs to
    pub kind: ResourceKind,
    /// Incremented exactly once per successful write
    pub version: Version,
    /// Domain fields
    pub payload: Payload,
    /// Soft-delete flag
    pub archived: bool,
}

impl VersionedRecord {
    /// Build a freshly inserted record at [`Version::INITIAL`]
    pub fn new(id: RecordId, kind: ResourceKind, mut payload: Payload, now: DateTime<Utc>) -> Self {
        payload.retain(|field, _| !is_bookkeeping_field(field));
        let stamp = Value::String(now.to_rfc3339());
        payload.insert(CREATED_AT_FIELD.to_string(), stamp.clone());
        payload.insert(UPDATED_AT_FIELD.to_string(), stamp);
        Self {
            id,
            kind,
            version: Version::INITIAL,
            payload,
            archived: false,
        }
    }

    /// Read a field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Read a string field
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// Produce the successor of this record under `patch`
    ///
    /// The result has `version + 1` and a refreshed `updatedAt`. Bookkeeping
    /// keys in the patch are ignored.
    pub fn apply(&self, patch: &Patch, now: DateTime<Utc>) -> VersionedRecord {
        let mut next = self.clone();
        for field in &patch.unset {
            if !is_bookkeeping_field(field) {
                next.payload.remove(field);
            }
        }
        for (field, value) in &patch.set {
            if !is_bookkeeping_field(field) {
                next.payload.insert(field.clone(), value.clone());
            }
        }
        if let Some(archived) = patch.archived {
            next.archived = archived;
        }
        next.payload.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(now.to_rfc3339()),
        );
        next.version = self.version.next();
        next
    }
}

/// A partial update applied by a conditional write
///
/// # Example
///
/// ```
/// use slotguard_core::Patch;
/// use serde_json::json;
///
/// let patch = Patch::new()
///     .set("status", json!("maintenance"))
///     .unset("note");
/// assert_eq!(patch.set.len(), 1);
/// assert!(!patch.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Fields to insert or overwrite
    #[serde(default)]
    pub set: Payload,
    /// Fields to remove
    #[serde(default)]
    pub unset: Vec<String>,
    /// New soft-delete flag, if changing
    #[serde(default)]
    pub archived: Option<bool>,
}

impl Patch {
    /// An empty patch (still bumps the version when applied)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Remove a field
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// Mark the record archived
    pub fn archive(mut self) -> Self {
        self.archived = Some(true);
        self
    }

    /// Restore an archived record
    pub fn restore(mut self) -> Self {
        self.archived = Some(false);
        self
    }

    /// Build a patch that sets every field of `payload`
    pub fn from_payload(payload: Payload) -> Self {
        Self {
            set: payload,
            ..Self::default()
        }
    }

    /// True if the patch changes nothing but the version
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.archived.is_none()
    }
}
