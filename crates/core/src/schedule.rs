//! Schedule assignment types
//!
//! A [`ScheduleAssignment`] is a typed view over a schedule
//! [`VersionedRecord`]. While active, no two assignments may share
//! `(room, day, time)`, `(instructor, day, time)` or `(section, day, time)`.
//! Those are the three [`ConflictKind`] dimensions.

use crate::error::{Error, Result};
use crate::record::{Payload, VersionedRecord};
use crate::types::{RecordId, ResourceKind, Version};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Payload field names of a schedule record
pub mod fields {
    /// Room identifier
    pub const ROOM: &str = "room";
    /// Weekday label
    pub const DAY: &str = "day";
    /// Display-formatted time range
    pub const TIME: &str = "time";
    /// Instructor identifier
    pub const INSTRUCTOR: &str = "instructor";
    /// Section identifier
    pub const SECTION: &str = "section";
    /// Course code
    pub const COURSE: &str = "course";
    /// Year level
    pub const YEAR: &str = "year";
}

/// Domain fields of a schedule assignment
///
/// Decoding is lenient: stored numbers or booleans become their string form
/// and missing or null fields become empty strings, so every stored record
/// decodes and [`AssignmentFields::validate`] reports what is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFields {
    /// Room identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub room: String,
    /// Weekday label
    #[serde(default, deserialize_with = "lenient_string")]
    pub day: String,
    /// Display-formatted time range
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: String,
    /// Instructor identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub instructor: String,
    /// Section identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: String,
    /// Course code
    #[serde(default, deserialize_with = "lenient_string")]
    pub course: String,
    /// Year level
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: String,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl AssignmentFields {
    /// Reject empty slot dimensions
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            (fields::ROOM, &self.room),
            (fields::DAY, &self.day),
            (fields::TIME, &self.time),
            (fields::INSTRUCTOR, &self.instructor),
            (fields::SECTION, &self.section),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(name, "must not be empty"));
            }
        }
        Ok(())
    }

    /// Encode as a record payload
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert(fields::ROOM.into(), Value::String(self.room.clone()));
        payload.insert(fields::DAY.into(), Value::String(self.day.clone()));
        payload.insert(fields::TIME.into(), Value::String(self.time.clone()));
        payload.insert(fields::INSTRUCTOR.into(), Value::String(self.instructor.clone()));
        payload.insert(fields::SECTION.into(), Value::String(self.section.clone()));
        payload.insert(fields::COURSE.into(), Value::String(self.course.clone()));
        payload.insert(fields::YEAR.into(), Value::String(self.year.clone()));
        payload
    }

    /// The slot these fields would occupy, as a conflict-check candidate
    pub fn candidate(&self, exclude_id: Option<RecordId>) -> ScheduleCandidate {
        ScheduleCandidate {
            room: self.room.clone(),
            day: self.day.clone(),
            time: self.time.clone(),
            instructor: self.instructor.clone(),
            section: self.section.clone(),
            exclude_id,
        }
    }
}

/// A schedule record with its domain fields decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAssignment {
    /// Record identifier
    pub id: RecordId,
    /// Record version
    pub version: Version,
    /// Soft-delete flag
    pub archived: bool,
    /// Domain fields
    #[serde(flatten)]
    pub fields: AssignmentFields,
}

impl ScheduleAssignment {
    /// Decode a schedule record
    pub fn from_record(record: &VersionedRecord) -> Result<Self> {
        if record.kind != ResourceKind::Schedule {
            return Err(Error::validation(
                "kind",
                format!("record {} is a {}, not a schedule", record.id, record.kind),
            ));
        }
        let object: serde_json::Map<String, Value> = record
            .payload
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let fields: AssignmentFields = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            id: record.id.clone(),
            version: record.version,
            archived: record.archived,
            fields,
        })
    }
}

/// A slot to check for collisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCandidate {
    /// Room identifier
    pub room: String,
    /// Weekday label
    pub day: String,
    /// Display-formatted time range
    pub time: String,
    /// Instructor identifier
    pub instructor: String,
    /// Section identifier
    pub section: String,
    /// Assignment being updated; never collides with itself
    #[serde(default)]
    pub exclude_id: Option<RecordId>,
}

/// How two time strings are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotMatching {
    /// Same day and identical time string
    #[default]
    Exact,
    /// Same day and intersecting parsed time ranges
    Overlap,
}

/// One of the three collision dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Same room, day and time
    Room,
    /// Same instructor, day and time
    Instructor,
    /// Same section, day and time
    Section,
}

impl ConflictKind {
    /// Checked in this order
    pub const ALL: [ConflictKind; 3] = [
        ConflictKind::Room,
        ConflictKind::Instructor,
        ConflictKind::Section,
    ];

    /// Payload field carrying this dimension's resource
    pub fn field(&self) -> &'static str {
        match self {
            ConflictKind::Room => fields::ROOM,
            ConflictKind::Instructor => fields::INSTRUCTOR,
            ConflictKind::Section => fields::SECTION,
        }
    }

    /// The candidate's value for this dimension
    pub fn value_of<'a>(&self, candidate: &'a ScheduleCandidate) -> &'a str {
        match self {
            ConflictKind::Room => &candidate.room,
            ConflictKind::Instructor => &candidate.instructor,
            ConflictKind::Section => &candidate.section,
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Collisions found along one dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionConflict {
    /// Dimension that collided
    pub kind: ConflictKind,
    /// Existing active assignments occupying the slot
    pub colliding_records: Vec<ScheduleAssignment>,
}

/// Aggregate result of a schedule conflict check
///
/// Holds one entry per dimension that collided. Empty means no conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Colliding dimensions, in room, instructor, section order
    pub conflicts: Vec<DimensionConflict>,
}

impl ConflictReport {
    /// True when no dimension collided
    pub fn is_clear(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Whether a given dimension collided
    pub fn has(&self, kind: ConflictKind) -> bool {
        self.conflicts.iter().any(|c| c.kind == kind)
    }

    /// The collisions for one dimension, if any
    pub fn get(&self, kind: ConflictKind) -> Option<&DimensionConflict> {
        self.conflicts.iter().find(|c| c.kind == kind)
    }

    /// Colliding dimensions
    pub fn kinds(&self) -> Vec<ConflictKind> {
        self.conflicts.iter().map(|c| c.kind).collect()
    }

    /// Record a dimension's collisions; empty lists are dropped
    pub fn push(&mut self, kind: ConflictKind, colliding_records: Vec<ScheduleAssignment>) {
        if !colliding_records.is_empty() {
            self.conflicts.push(DimensionConflict {
                kind,
                colliding_records,
            });
        }
    }

    /// Turn a non-empty report into [`Error::ConflictDetected`]
    pub fn into_result(self) -> Result<ConflictReport> {
        if self.is_clear() {
            Ok(self)
        } else {
            Err(Error::ConflictDetected { report: self })
        }
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return f.write_str("no conflicts");
        }
        let parts: Vec<String> = self
            .conflicts
            .iter()
            .map(|c| {
                let ids: Vec<&str> = c.colliding_records.iter().map(|a| a.id.as_str()).collect();
                format!("{} taken by {}", c.kind, ids.join(", "))
            })
            .collect();
        f.write_str(&parts.join("; "))
    }
}
