//! Convenient imports for slotguard.
//!
//! ```ignore
//! use slotguard::prelude::*;
//!
//! let scheduler = Scheduler::builder().build()?;
//! ```

// Main entry point
pub use crate::scheduler::{Scheduler, SchedulerBuilder, StatusChange};

// Configuration and audit
pub use crate::audit::{AuditLog, MemoryAuditLog};
pub use crate::config::SchedulerConfig;

// Error handling
pub use slotguard_core::{Error, Result};

// Core types
pub use slotguard_core::{
    AssignmentFields, ConflictKind, ConflictReport, Filter, Patch, Payload, RecordId, ResourceKind,
    ScheduleAssignment, ScheduleCandidate, SlotMatching, UserId, Version, VersionedRecord,
};

// Concurrency
pub use slotguard_concurrency::{
    BatchReport, ConflictPolicy, OperationAction, RetryPolicy, TransactionStatus,
    TransactionSummary,
};

// Storage
pub use slotguard_storage::{MemoryStore, StoreCapabilities, VersionStore};

// Re-export serde_json for convenience
pub use serde_json::json;
