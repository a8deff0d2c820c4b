//! Record filters for `find` queries

use crate::record::VersionedRecord;
use crate::types::{RecordId, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Equality filter over one resource collection
///
/// Archived records are excluded unless [`Filter::include_archived`] is
/// called.
///
/// # Example
///
/// ```
/// use slotguard_core::{Filter, ResourceKind};
///
/// let filter = Filter::new(ResourceKind::Schedule)
///     .eq("room", "A-101")
///     .eq("day", "Mon");
/// assert_eq!(filter.fields.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Collection to search
    pub kind: ResourceKind,
    /// Field equality constraints, all must hold
    pub fields: BTreeMap<String, Value>,
    /// Record to leave out of the result (e.g. the record being updated)
    pub exclude_id: Option<RecordId>,
    /// Whether archived records match
    pub include_archived: bool,
}

impl Filter {
    /// Match every active record of `kind`
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
            exclude_id: None,
            include_archived: false,
        }
    }

    /// Require `field == value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Leave `id` out of the result
    pub fn excluding(mut self, id: Option<RecordId>) -> Self {
        self.exclude_id = id;
        self
    }

    /// Also match archived records
    pub fn include_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    /// Evaluate the filter against a record
    pub fn matches(&self, record: &VersionedRecord) -> bool {
        if record.kind != self.kind {
            return false;
        }
        if record.archived && !self.include_archived {
            return false;
        }
        if self.exclude_id.as_ref() == Some(&record.id) {
            return false;
        }
        self.fields
            .iter()
            .all(|(field, expected)| record.payload.get(field) == Some(expected))
    }
}
