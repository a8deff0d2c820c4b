//! Request-scoped transaction recording
//!
//! A [`TransactionRecorder`] groups the operations one request performs into
//! a single logical transaction for auditing. It is not a storage transaction:
//! each write has already been applied atomically by the store, and rolling
//! back only marks the record of them as abandoned.
//!
//! ## Lifecycle
//!
//! ```text
//! create() -> Active
//!   add_operation() / record()  (any number of times)
//!   mark_partial_success()      (optional)
//! commit()   -> Committed | PartialSuccess
//! rollback() -> RolledBack
//! ```
//!
//! `commit` and `rollback` consume the recorder, so a finalized transaction
//! cannot accumulate further operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotguard_core::{RecordId, TransactionId, UserId, Version, VersionedRecord};
use tracing::{info, warn};

/// Lifecycle state of a logical transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Still accumulating operations
    Active,
    /// Finalized with every operation successful
    Committed,
    /// Abandoned; applied writes are not undone
    RolledBack,
    /// Finalized with at least one failed item
    PartialSuccess,
}

impl TransactionStatus {
    /// Whether the transaction has been finalized
    pub fn is_finished(&self) -> bool {
        !matches!(self, TransactionStatus::Active)
    }
}

/// What an operation did to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationAction {
    /// Record inserted
    Create,
    /// Fields changed
    Update,
    /// Record removed
    Delete,
    /// Instructor moved to another person
    Reassign,
    /// Status or archive flag changed
    StatusUpdate,
}

impl OperationAction {
    /// Snake-case name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationAction::Create => "create",
            OperationAction::Update => "update",
            OperationAction::Delete => "delete",
            OperationAction::Reassign => "reassign",
            OperationAction::StatusUpdate => "status_update",
        }
    }
}

/// One operation inside a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEvent {
    /// Record affected
    pub record_id: RecordId,
    /// What was done
    pub action: OperationAction,
    /// Version the record has after the operation
    pub resulting_version: Version,
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
    /// Optional copy of the record as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_snapshot: Option<VersionedRecord>,
}

/// Accumulated transaction state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction id
    pub id: TransactionId,
    /// Actor that started the transaction
    pub user_id: UserId,
    /// What the request set out to do, e.g. `room_status_update`
    pub operation_kind: String,
    /// Creation time
    pub started_at: DateTime<Utc>,
    /// Finalization time, once finished
    pub ended_at: Option<DateTime<Utc>>,
    /// Current status
    pub status: TransactionStatus,
    /// Operations in the order they were recorded
    pub operations: Vec<OperationEvent>,
}

/// Final, serializable record of a finished transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// Transaction id
    pub id: TransactionId,
    /// Actor that started the transaction
    pub user_id: UserId,
    /// What the request set out to do
    pub operation_kind: String,
    /// Final status
    pub status: TransactionStatus,
    /// Creation time
    pub started_at: DateTime<Utc>,
    /// Finalization time
    pub ended_at: DateTime<Utc>,
    /// `ended_at - started_at` in milliseconds, never negative
    pub duration_ms: u64,
    /// Number of operations recorded
    pub operation_count: usize,
    /// Operations in the order they were recorded
    pub operations: Vec<OperationEvent>,
    /// Reason given to [`TransactionRecorder::rollback`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl TransactionSummary {
    /// Ids of every record touched, in order
    pub fn record_ids(&self) -> Vec<&RecordId> {
        self.operations.iter().map(|op| &op.record_id).collect()
    }
}

/// Records the operations of one request
///
/// Not shared between requests and not `Clone`: each request owns its
/// recorder and finalizes it exactly once.
#[derive(Debug)]
pub struct TransactionRecorder {
    txn: Transaction,
}

impl TransactionRecorder {
    /// Start a new, active transaction labelled `operation_kind`
    pub fn create(user_id: UserId, operation_kind: impl Into<String>) -> Self {
        let txn = Transaction {
            id: TransactionId::new(),
            user_id,
            operation_kind: operation_kind.into(),
            started_at: Utc::now(),
            ended_at: None,
            status: TransactionStatus::Active,
            operations: Vec::new(),
        };
        Self { txn }
    }

    /// Transaction id
    pub fn id(&self) -> TransactionId {
        self.txn.id
    }

    /// Current state
    pub fn transaction(&self) -> &Transaction {
        &self.txn
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.txn.status
    }

    /// Append an operation event
    pub fn add_operation(
        &mut self,
        record_id: RecordId,
        action: OperationAction,
        resulting_version: Version,
        result_snapshot: Option<VersionedRecord>,
    ) {
        self.txn.operations.push(OperationEvent {
            record_id,
            action,
            resulting_version,
            timestamp: Utc::now(),
            result_snapshot,
        });
    }

    /// Append an event for a written record, keeping a copy of it
    pub fn record(&mut self, action: OperationAction, record: &VersionedRecord) {
        self.add_operation(
            record.id.clone(),
            action,
            record.version,
            Some(record.clone()),
        );
    }

    /// Flag that some items failed; `commit` keeps this status
    pub fn mark_partial_success(&mut self) {
        self.txn.status = TransactionStatus::PartialSuccess;
    }

    /// Finalize as committed, or as partial success if so marked
    pub fn commit(mut self) -> TransactionSummary {
        if self.txn.status != TransactionStatus::PartialSuccess {
            self.txn.status = TransactionStatus::Committed;
        }
        let summary = self.finish(None);
        info!(
            txn_id = %summary.id,
            user = %summary.user_id,
            kind = %summary.operation_kind,
            status = ?summary.status,
            operations = summary.operation_count,
            duration_ms = summary.duration_ms,
            "Transaction committed"
        );
        summary
    }

    /// Finalize as rolled back
    ///
    /// Already-applied writes stay applied; the summary just records that
    /// the request was abandoned and why.
    pub fn rollback(mut self, reason: impl Into<String>) -> TransactionSummary {
        self.txn.status = TransactionStatus::RolledBack;
        let summary = self.finish(Some(reason.into()));
        warn!(
            txn_id = %summary.id,
            user = %summary.user_id,
            kind = %summary.operation_kind,
            operations = summary.operation_count,
            reason = summary.failure_reason.as_deref().unwrap_or_default(),
            "Transaction rolled back"
        );
        summary
    }

    fn finish(self, failure_reason: Option<String>) -> TransactionSummary {
        let ended_at = Utc::now();
        let Transaction {
            id,
            user_id,
            operation_kind,
            started_at,
            status,
            operations,
            ..
        } = self.txn;
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        TransactionSummary {
            id,
            user_id,
            operation_kind,
            status,
            started_at,
            ended_at,
            duration_ms,
            operation_count: operations.len(),
            operations,
            failure_reason,
        }
    }
}
