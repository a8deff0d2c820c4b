//! Audit trail for scheduler operations
//!
//! Every finished transaction is handed to an [`AuditLog`], together with a
//! field-level [`ChangeRecord`] for updates. Audit failures are logged and
//! never fail the operation that produced them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use slotguard_concurrency::{OperationAction, TransactionSummary};
use slotguard_core::{DiffEntry, RecordId, Result, TransactionId, UserId};

/// Field-level change to one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Transaction that made the change
    pub transaction_id: TransactionId,
    /// Record changed
    pub record_id: RecordId,
    /// What was done
    pub action: OperationAction,
    /// Actor
    pub user_id: UserId,
    /// Fields that changed
    pub changes: Vec<DiffEntry>,
    /// When the change was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Sink for audit events
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Persist a finished transaction
    async fn record_transaction(&self, summary: &TransactionSummary) -> Result<()>;

    /// Persist a field-level change
    async fn record_change(&self, change: &ChangeRecord) -> Result<()>;
}

/// In-process audit log, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    transactions: Mutex<Vec<TransactionSummary>>,
    changes: Mutex<Vec<ChangeRecord>>,
}

impl MemoryAuditLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Transactions recorded so far, oldest first
    pub fn transactions(&self) -> Vec<TransactionSummary> {
        self.transactions.lock().clone()
    }

    /// Change records recorded so far, oldest first
    pub fn changes(&self) -> Vec<ChangeRecord> {
        self.changes.lock().clone()
    }

    /// Change records for one record
    pub fn changes_for(&self, record_id: &RecordId) -> Vec<ChangeRecord> {
        self.changes
            .lock()
            .iter()
            .filter(|c| &c.record_id == record_id)
            .cloned()
            .collect()
    }

    /// Most recently recorded transaction
    pub fn last_transaction(&self) -> Option<TransactionSummary> {
        self.transactions.lock().last().cloned()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record_transaction(&self, summary: &TransactionSummary) -> Result<()> {
        self.transactions.lock().push(summary.clone());
        Ok(())
    }

    async fn record_change(&self, change: &ChangeRecord) -> Result<()> {
        self.changes.lock().push(change.clone());
        Ok(())
    }
}

/// Discards everything; used when auditing is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditLog;

#[async_trait]
impl AuditLog for NoopAuditLog {
    async fn record_transaction(&self, _summary: &TransactionSummary) -> Result<()> {
        Ok(())
    }

    async fn record_change(&self, _change: &ChangeRecord) -> Result<()> {
        Ok(())
    }
}
