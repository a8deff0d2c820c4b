//! # slotguard
//!
//! Optimistic concurrency control and double-booking detection for
//! scheduling records: rooms, sections, instructors and schedule
//! assignments.
//!
//! ## Quick Start
//!
//! ```ignore
//! use slotguard::prelude::*;
//!
//! let scheduler = Scheduler::builder()
//!     .config(SchedulerConfig::from_env())
//!     .build()?;
//!
//! let user = UserId::new("registrar");
//! let assignment = scheduler
//!     .create_assignment(&user, request, ConflictPolicy::Reject)
//!     .await?;
//!
//! // Someone else edits it in the meantime: this write loses
//! let err = scheduler
//!     .update_assignment(&user, &assignment.id, assignment.version, &patch, ConflictPolicy::Reject)
//!     .await
//!     .unwrap_err();
//! assert!(err.is_version_conflict());
//! ```
//!
//! ## Layers
//!
//! - [`slotguard_core`]: records, versions, patches, schedule types, errors, diffs
//! - [`slotguard_storage`]: the [`VersionStore`] contract and [`MemoryStore`]
//! - [`slotguard_concurrency`]: retry, conflict detection, transactions, batches, snapshot reads
//! - this crate: the [`Scheduler`] facade, configuration, audit log and tracing setup

#![warn(missing_docs)]

pub mod audit;
pub mod config;
pub mod logging;
pub mod prelude;
mod scheduler;

pub use audit::{AuditLog, ChangeRecord, MemoryAuditLog, NoopAuditLog};
pub use config::{RetryConfig, SchedulerConfig};
pub use scheduler::{Scheduler, SchedulerBuilder, StatusChange, STATUS_FIELD};

pub use slotguard_concurrency::{
    BatchFailure, BatchReport, ConflictPolicy, OperationAction, RetryPolicy, TransactionStatus,
    TransactionSummary,
};
pub use slotguard_core::{Error, Result};
pub use slotguard_storage::{MemoryStore, VersionStore};
