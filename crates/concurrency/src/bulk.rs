//! Per-item isolated batch execution
//!
//! Each item runs under the retry coordinator on its own. A failing item is
//! captured with its error and the batch moves on; nothing an item returns
//! can abort the items after it. Successful writes are recorded in the
//! batch's transaction, which commits as `partial_success` if any item
//! failed.

use crate::retry::RetryCoordinator;
use crate::transaction::{OperationAction, TransactionRecorder, TransactionSummary};
use slotguard_core::{Error, Result, VersionedRecord};
use std::future::Future;
use tracing::{debug, warn};

/// An item that could not be applied
#[derive(Debug, Clone)]
pub struct BatchFailure<I> {
    /// The input item, handed back unchanged
    pub item: I,
    /// Why it failed
    pub error: Error,
}

impl<I> BatchFailure<I> {
    /// Human-readable failure reason
    pub fn reason(&self) -> String {
        self.error.user_message()
    }
}

/// Outcome of a batch: what worked, what didn't, and the transaction record
#[derive(Debug, Clone)]
pub struct BatchReport<I> {
    /// Records written, in input order
    pub succeeded: Vec<VersionedRecord>,
    /// Items that failed, in input order
    pub failed: Vec<BatchFailure<I>>,
    /// Finalized transaction covering the batch
    pub summary: TransactionSummary,
}

impl<I> BatchReport<I> {
    /// Number of items applied
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of items that failed
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Whether every item was applied
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives a list of independent record operations
#[derive(Debug, Clone, Default)]
pub struct BulkOperationRunner {
    retry: RetryCoordinator,
}

impl BulkOperationRunner {
    /// Runner retrying each item with `retry`
    pub fn new(retry: RetryCoordinator) -> Self {
        Self { retry }
    }

    /// Apply `op` to every item, isolating failures
    ///
    /// `op` is invoked again on each retry of an item, so it must re-read
    /// anything it depends on. Every success is recorded in `recorder` under
    /// `action`; the recorder is then committed and its summary returned in
    /// the report.
    pub async fn run_batch<I, F, Fut>(
        &self,
        mut recorder: TransactionRecorder,
        action: OperationAction,
        items: Vec<I>,
        op: F,
    ) -> BatchReport<I>
    where
        F: Fn(&I) -> Fut,
        Fut: Future<Output = Result<VersionedRecord>>,
    {
        let total = items.len();
        let mut succeeded = Vec::with_capacity(total);
        let mut failed = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            match self.retry.run(|| op(&item)).await {
                Ok(record) => {
                    debug!(index, record_id = %record.id, version = %record.version, "Batch item applied");
                    recorder.record(action, &record);
                    succeeded.push(record);
                }
                Err(error) => {
                    warn!(index, code = error.code(), error = %error, "Batch item failed");
                    failed.push(BatchFailure { item, error });
                }
            }
        }

        if !failed.is_empty() {
            recorder.mark_partial_success();
        }
        let summary = recorder.commit();
        debug!(
            txn_id = %summary.id,
            total,
            succeeded = succeeded.len(),
            failed = failed.len(),
            "Batch finished"
        );

        BatchReport {
            succeeded,
            failed,
            summary,
        }
    }
}
