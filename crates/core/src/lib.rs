//! Core types for slotguard
//!
//! This crate defines the data model shared by the storage and concurrency
//! layers:
//! - Identifiers: [`RecordId`], [`Version`], [`ResourceKind`], [`TransactionId`], [`UserId`]
//! - Records: [`VersionedRecord`], [`Patch`], [`Filter`]
//! - Scheduling: [`ScheduleAssignment`], [`ScheduleCandidate`], [`ConflictReport`], [`TimeRange`]
//! - Audit diffs: [`ChangeDiffer`], [`DiffEntry`]
//! - The closed error taxonomy: [`Error`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod error;
pub mod filter;
pub mod record;
pub mod schedule;
pub mod time_range;
pub mod types;

pub use diff::{diff, ChangeDiffer, DiffEntry};
pub use error::{Error, Result};
pub use filter::Filter;
pub use record::{is_bookkeeping_field, Patch, Payload, VersionedRecord, BOOKKEEPING_FIELDS};
pub use schedule::{
    AssignmentFields, ConflictKind, ConflictReport, DimensionConflict, ScheduleAssignment,
    ScheduleCandidate, SlotMatching,
};
pub use time_range::TimeRange;
pub use types::{RecordId, ResourceKind, TransactionId, UserId, Version};
