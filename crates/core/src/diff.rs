//! Field-level change diffs for audit logs
//!
//! Pure functions: no I/O, no clocks other than the timestamp stamped on
//! each entry.

use crate::record::{is_bookkeeping_field, Payload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Field name
    pub field: String,
    /// Value before the change, `None` if the field was added
    pub old_value: Option<Value>,
    /// Value after the change, `None` if the field was removed
    pub new_value: Option<Value>,
    /// When the diff was computed
    pub timestamp: DateTime<Utc>,
}

/// Computes field-level diffs, skipping bookkeeping fields
///
/// # Example
///
/// ```
/// use slotguard_core::{ChangeDiffer, Payload};
/// use serde_json::json;
///
/// let mut old = Payload::new();
/// old.insert("name".into(), json!("A"));
/// let mut new = old.clone();
/// new.insert("name".into(), json!("B"));
///
/// let entries = ChangeDiffer::new().diff(&old, &new);
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].field, "name");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChangeDiffer {
    extra_excluded: BTreeSet<String>,
}

impl ChangeDiffer {
    /// Differ that excludes only the standard bookkeeping fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Also exclude `field` from diffs
    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.extra_excluded.insert(field.into());
        self
    }

    fn is_excluded(&self, field: &str) -> bool {
        is_bookkeeping_field(field) || self.extra_excluded.contains(field)
    }

    /// Diff two payloads, stamping entries with the current time
    pub fn diff(&self, old: &Payload, new: &Payload) -> Vec<DiffEntry> {
        self.diff_at(old, new, Utc::now())
    }

    /// Diff two payloads with an explicit timestamp
    ///
    /// Entries come out in field order. Values are compared structurally,
    /// so `1` and `1.0` differ but key order inside objects does not.
    pub fn diff_at(&self, old: &Payload, new: &Payload, timestamp: DateTime<Utc>) -> Vec<DiffEntry> {
        let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
        keys.into_iter()
            .filter(|field| !self.is_excluded(field))
            .filter_map(|field| {
                let before = old.get(field);
                let after = new.get(field);
                (before != after).then(|| DiffEntry {
                    field: field.clone(),
                    old_value: before.cloned(),
                    new_value: after.cloned(),
                    timestamp,
                })
            })
            .collect()
    }
}

/// Diff two payloads with the default exclusions
pub fn diff(old: &Payload, new: &Payload) -> Vec<DiffEntry> {
    ChangeDiffer::new().diff(old, new)
}
