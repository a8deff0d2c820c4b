//! Concurrency layer for slotguard
//!
//! This crate implements optimistic concurrency control (OCC) on top of a
//! [`slotguard_storage::VersionStore`]:
//! - [`RetryCoordinator`]: exponential-backoff retry of version conflicts
//! - [`ConflictDetector`]: room / instructor / section collision checks
//! - [`TransactionRecorder`]: request-scoped audit transaction
//! - [`BulkOperationRunner`]: per-item isolated batches
//! - [`SnapshotReader`]: consistent reads with graceful degradation
//!
//! Every type here is constructed per request and carries no state across
//! requests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bulk;
pub mod conflict;
pub mod retry;
pub mod snapshot;
pub mod transaction;

pub use bulk::{BatchFailure, BatchReport, BulkOperationRunner};
pub use conflict::{ConflictDetector, ConflictPolicy};
pub use retry::{with_retry, RetryCoordinator, RetryPolicy};
pub use snapshot::{ReadTier, SnapshotReader};
pub use transaction::{
    OperationAction, OperationEvent, Transaction, TransactionRecorder, TransactionStatus,
    TransactionSummary,
};
