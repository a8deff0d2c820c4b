//! The scheduler facade
//!
//! [`Scheduler`] ties a [`VersionStore`] to the concurrency layer: every
//! write goes through a conditional update, every request gets its own
//! [`TransactionRecorder`], and every finished transaction lands in the
//! [`AuditLog`].
//!
//! # Example
//!
//! ```ignore
//! use slotguard::prelude::*;
//!
//! let scheduler = Scheduler::builder().build()?;
//! let user = UserId::new("registrar");
//! let assignment = scheduler
//!     .create_assignment(&user, fields, ConflictPolicy::Reject)
//!     .await?;
//! ```

use crate::audit::{AuditLog, ChangeRecord, MemoryAuditLog, NoopAuditLog};
use crate::config::SchedulerConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use slotguard_concurrency::{
    BatchReport, BulkOperationRunner, ConflictDetector, ConflictPolicy, OperationAction,
    RetryCoordinator, RetryPolicy, SnapshotReader, TransactionRecorder, TransactionSummary,
};
use slotguard_core::schedule::fields;
use slotguard_core::{
    AssignmentFields, ChangeDiffer, ConflictReport, Error, Filter, Patch, Payload, RecordId,
    ResourceKind, Result, ScheduleAssignment, ScheduleCandidate, SlotMatching, UserId, Version,
    VersionedRecord,
};
use slotguard_storage::{MemoryStore, VersionStore};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Payload field holding a room's (or any record's) status
pub const STATUS_FIELD: &str = "status";

/// One item of [`Scheduler::bulk_update_status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Record to change
    pub id: RecordId,
    /// Version the caller last saw
    pub expected_version: Version,
    /// New status value
    pub status: String,
}

impl StatusChange {
    /// Build a status change
    pub fn new(id: impl Into<RecordId>, expected_version: Version, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expected_version,
            status: status.into(),
        }
    }
}

/// Optimistic-concurrency scheduling service
///
/// Holds no per-request state; share it behind an `Arc` between tasks.
pub struct Scheduler {
    store: Arc<dyn VersionStore>,
    retry: RetryCoordinator,
    matching: SlotMatching,
    audit: Arc<dyn AuditLog>,
    differ: ChangeDiffer,
}

impl Scheduler {
    /// Create a builder for scheduler configuration
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// Active retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Active slot matching mode
    pub fn slot_matching(&self) -> SlotMatching {
        self.matching
    }

    // ========================================================================
    // Generic record operations
    // ========================================================================

    /// Insert a record of any kind
    pub async fn create_record(
        &self,
        user: &UserId,
        kind: ResourceKind,
        payload: Payload,
    ) -> Result<VersionedRecord> {
        let recorder = TransactionRecorder::create(user.clone(), format!("{}_create", kind));
        let result = self.store.insert(kind, None, payload).await;
        self.settle_single(recorder, OperationAction::Create, result).await
    }

    /// Apply `patch` only if the record is still at `expected`
    ///
    /// Schedule records are validated and re-checked for collisions with
    /// every other active assignment before the write.
    ///
    /// # Errors
    /// - [`Error::VersionConflict`] if the record moved on
    /// - [`Error::NotFound`] if the record is missing or not of `kind`
    /// - [`Error::ConflictDetected`] if a schedule change would collide
    pub async fn update_with_version_control(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        expected: Version,
        patch: &Patch,
    ) -> Result<VersionedRecord> {
        let recorder = TransactionRecorder::create(UserId::system(), format!("{}_update", kind));
        let result = async {
            let before = self.load(kind, id).await?;
            if kind == ResourceKind::Schedule {
                self.recheck_assignment(&before, expected, patch, ConflictPolicy::Reject)
                    .await?;
            }
            let after = self.store.conditional_update(id, expected, patch).await?;
            Ok::<_, Error>((before, after))
        }
        .await;
        self.settle_change(recorder, OperationAction::Update, result).await
    }

    /// Re-read, recompute and conditionally write until it sticks
    ///
    /// `modify` sees the latest record on every attempt, so a lost race is
    /// resolved by recomputing against fresh data rather than replaying a
    /// stale write.
    pub async fn modify_with_retry<F>(
        &self,
        user: &UserId,
        kind: ResourceKind,
        id: &RecordId,
        action: OperationAction,
        modify: F,
    ) -> Result<VersionedRecord>
    where
        F: Fn(&VersionedRecord) -> Result<Patch> + Send + Sync,
    {
        let recorder =
            TransactionRecorder::create(user.clone(), format!("{}_{}", kind, action.as_str()));
        let modify = &modify;
        let result = self
            .retry
            .run(|| async move {
                let before = self.load(kind, id).await?;
                let patch = modify(&before)?;
                let after = self
                    .store
                    .conditional_update(id, before.version, &patch)
                    .await?;
                Ok::<_, Error>((before, after))
            })
            .await;
        self.settle_change(recorder, action, result).await
    }

    /// Set a room's status, retrying lost races
    pub async fn update_room_status(
        &self,
        user: &UserId,
        room_id: &RecordId,
        status: &str,
    ) -> Result<VersionedRecord> {
        if status.trim().is_empty() {
            return Err(Error::validation(STATUS_FIELD, "must not be empty"));
        }
        self.modify_with_retry(
            user,
            ResourceKind::Room,
            room_id,
            OperationAction::StatusUpdate,
            |_| Ok(Patch::new().set(STATUS_FIELD, status)),
        )
        .await
    }

    /// Apply many status changes, each against its own expected version
    ///
    /// Stale items fail individually; the rest are applied.
    pub async fn bulk_update_status(
        &self,
        user: &UserId,
        kind: ResourceKind,
        items: Vec<StatusChange>,
    ) -> BatchReport<StatusChange> {
        let store = &self.store;
        self.run_batch(
            user,
            &format!("{}_bulk_status_update", kind),
            OperationAction::StatusUpdate,
            items,
            |item: &StatusChange| {
                let item = item.clone();
                async move {
                    if item.status.trim().is_empty() {
                        return Err(Error::validation(STATUS_FIELD, "must not be empty"));
                    }
                    let current = store.get(&item.id).await?;
                    if current.kind != kind {
                        return Err(Error::not_found(&item.id));
                    }
                    store
                        .conditional_update(
                            &item.id,
                            item.expected_version,
                            &Patch::new().set(STATUS_FIELD, item.status.as_str()),
                        )
                        .await
                }
            },
        )
        .await
    }

    // ========================================================================
    // Schedule assignments
    // ========================================================================

    /// Collisions a candidate slot would cause
    pub async fn check_schedule_conflict(
        &self,
        candidate: &ScheduleCandidate,
    ) -> Result<ConflictReport> {
        self.detector().check(candidate).await
    }

    /// Validate, check for collisions and insert a new assignment
    ///
    /// With [`ConflictPolicy::Override`] detected collisions are logged and
    /// ignored, but the store's `(room, day, time)` and
    /// `(instructor, day, time)` uniqueness constraints still apply and
    /// surface as [`Error::DuplicateResource`].
    pub async fn create_assignment(
        &self,
        user: &UserId,
        request: AssignmentFields,
        policy: ConflictPolicy,
    ) -> Result<ScheduleAssignment> {
        let recorder = TransactionRecorder::create(user.clone(), "schedule_create");
        let result = async {
            request.validate()?;
            self.detector()
                .ensure_clear(&request.candidate(None), policy)
                .await?;
            self.store
                .insert(ResourceKind::Schedule, None, request.to_payload())
                .await
        }
        .await;
        let record = self
            .settle_single(recorder, OperationAction::Create, result)
            .await?;
        info!(record_id = %record.id, user = %user, "Schedule assignment created");
        ScheduleAssignment::from_record(&record)
    }

    /// Change an assignment, re-checking collisions against every other
    /// active assignment
    pub async fn update_assignment(
        &self,
        user: &UserId,
        id: &RecordId,
        expected: Version,
        changes: &Patch,
        policy: ConflictPolicy,
    ) -> Result<ScheduleAssignment> {
        let recorder = TransactionRecorder::create(user.clone(), "schedule_update");
        let result = async {
            let before = self.load(ResourceKind::Schedule, id).await?;
            self.recheck_assignment(&before, expected, changes, policy).await?;
            let after = self.store.conditional_update(id, expected, changes).await?;
            Ok::<_, Error>((before, after))
        }
        .await;
        let record = self
            .settle_change(recorder, OperationAction::Update, result)
            .await?;
        ScheduleAssignment::from_record(&record)
    }

    /// Move an assignment to another instructor, retrying lost races
    pub async fn reassign_instructor(
        &self,
        user: &UserId,
        id: &RecordId,
        instructor: &str,
        policy: ConflictPolicy,
    ) -> Result<ScheduleAssignment> {
        if instructor.trim().is_empty() {
            return Err(Error::validation(fields::INSTRUCTOR, "must not be empty"));
        }
        let recorder = TransactionRecorder::create(user.clone(), "schedule_reassign_instructor");
        let result = self
            .retry
            .run(|| async move {
                let before = self.load(ResourceKind::Schedule, id).await?;
                let mut proposed = ScheduleAssignment::from_record(&before)?.fields;
                proposed.instructor = instructor.to_string();
                self.detector()
                    .ensure_clear(&proposed.candidate(Some(id.clone())), policy)
                    .await?;
                let patch = Patch::new().set(fields::INSTRUCTOR, instructor);
                let after = self
                    .store
                    .conditional_update(id, before.version, &patch)
                    .await?;
                Ok::<_, Error>((before, after))
            })
            .await;
        let record = self
            .settle_change(recorder, OperationAction::Reassign, result)
            .await?;
        ScheduleAssignment::from_record(&record)
    }

    /// Soft-delete an assignment, freeing its slot
    pub async fn archive_assignment(
        &self,
        user: &UserId,
        id: &RecordId,
        expected: Version,
    ) -> Result<VersionedRecord> {
        let recorder = TransactionRecorder::create(user.clone(), "schedule_archive");
        let result = async {
            self.load(ResourceKind::Schedule, id).await?;
            self.store
                .conditional_update(id, expected, &Patch::new().archive())
                .await
        }
        .await;
        self.settle_single(recorder, OperationAction::Delete, result)
            .await
    }

    /// Hard-delete every assignment of `section`, archived ones included
    ///
    /// Each deletion is independent. Deletions that already happened are not
    /// undone when a later one fails; the report lists both.
    pub async fn delete_assignments_for_section(
        &self,
        user: &UserId,
        section: &str,
    ) -> Result<BatchReport<VersionedRecord>> {
        if section.trim().is_empty() {
            return Err(Error::validation(fields::SECTION, "must not be empty"));
        }
        let filter = Filter::new(ResourceKind::Schedule)
            .eq(fields::SECTION, section)
            .include_archived();
        let targets = self.store.find(&filter).await?;
        debug!(section, count = targets.len(), "Cascading section delete");

        let store = &self.store;
        let report = self
            .run_batch(
                user,
                "section_cascade_delete",
                OperationAction::Delete,
                targets,
                |target: &VersionedRecord| {
                    let id = target.id.clone();
                    async move {
                        let current = store.get(&id).await?;
                        store.delete(&id, current.version).await
                    }
                },
            )
            .await;
        Ok(report)
    }

    // ========================================================================
    // Building blocks
    // ========================================================================

    /// Read at the strongest consistency the backend supports
    pub async fn read_consistent(&self, id: &RecordId) -> Result<VersionedRecord> {
        SnapshotReader::new(&*self.store).read_consistent(id).await
    }

    /// Run `operation` under the scheduler's retry policy
    pub async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry.run(operation).await
    }

    /// Run a batch in one audited transaction labelled `operation_kind`
    pub async fn run_batch<I, F, Fut>(
        &self,
        user: &UserId,
        operation_kind: &str,
        action: OperationAction,
        items: Vec<I>,
        op: F,
    ) -> BatchReport<I>
    where
        F: Fn(&I) -> Fut,
        Fut: Future<Output = Result<VersionedRecord>>,
    {
        let recorder = TransactionRecorder::create(user.clone(), operation_kind);
        let report = BulkOperationRunner::new(self.retry.clone())
            .run_batch(recorder, action, items, op)
            .await;
        self.audit_transaction(&report.summary).await;
        report
    }

    fn detector(&self) -> ConflictDetector<'_, dyn VersionStore> {
        ConflictDetector::new(&*self.store).with_matching(self.matching)
    }

    /// Validate the assignment `changes` would produce and check it against
    /// every other active assignment
    async fn recheck_assignment(
        &self,
        before: &VersionedRecord,
        expected: Version,
        changes: &Patch,
        policy: ConflictPolicy,
    ) -> Result<()> {
        if before.version != expected {
            return Err(Error::VersionConflict {
                id: before.id.clone(),
                expected,
                actual: before.version,
            });
        }
        let proposed = ScheduleAssignment::from_record(&before.apply(changes, Utc::now()))?;
        proposed.fields.validate()?;
        self.detector()
            .ensure_clear(&proposed.fields.candidate(Some(before.id.clone())), policy)
            .await?;
        Ok(())
    }

    /// Point read restricted to one collection
    async fn load(&self, kind: ResourceKind, id: &RecordId) -> Result<VersionedRecord> {
        let record = self.store.get(id).await?;
        if record.kind != kind {
            return Err(Error::not_found(id));
        }
        Ok(record)
    }

    async fn settle_single(
        &self,
        mut recorder: TransactionRecorder,
        action: OperationAction,
        result: Result<VersionedRecord>,
    ) -> Result<VersionedRecord> {
        match result {
            Ok(record) => {
                recorder.record(action, &record);
                self.complete(recorder).await;
                Ok(record)
            }
            Err(e) => {
                self.abandon(recorder, &e).await;
                Err(e)
            }
        }
    }

    async fn settle_change(
        &self,
        mut recorder: TransactionRecorder,
        action: OperationAction,
        result: Result<(VersionedRecord, VersionedRecord)>,
    ) -> Result<VersionedRecord> {
        match result {
            Ok((before, after)) => {
                recorder.record(action, &after);
                self.audit_change(&recorder, action, &before, &after).await;
                self.complete(recorder).await;
                Ok(after)
            }
            Err(e) => {
                self.abandon(recorder, &e).await;
                Err(e)
            }
        }
    }

    async fn complete(&self, recorder: TransactionRecorder) -> TransactionSummary {
        let summary = recorder.commit();
        self.audit_transaction(&summary).await;
        summary
    }

    async fn abandon(&self, recorder: TransactionRecorder, error: &Error) {
        let summary = recorder.rollback(error.to_string());
        self.audit_transaction(&summary).await;
    }

    async fn audit_change(
        &self,
        recorder: &TransactionRecorder,
        action: OperationAction,
        before: &VersionedRecord,
        after: &VersionedRecord,
    ) {
        let changes = self.differ.diff(&before.payload, &after.payload);
        if changes.is_empty() {
            return;
        }
        let change = ChangeRecord {
            transaction_id: recorder.id(),
            record_id: after.id.clone(),
            action,
            user_id: recorder.transaction().user_id.clone(),
            changes,
            recorded_at: Utc::now(),
        };
        if let Err(e) = self.audit.record_change(&change).await {
            warn!(record_id = %change.record_id, error = %e, "Failed to write change record");
        }
    }

    async fn audit_transaction(&self, summary: &TransactionSummary) {
        if let Err(e) = self.audit.record_transaction(summary).await {
            warn!(txn_id = %summary.id, error = %e, "Failed to write transaction audit");
        }
    }
}

/// Builder for [`Scheduler`]
///
/// # Example
///
/// ```ignore
/// let scheduler = Scheduler::builder()
///     .config(SchedulerConfig::from_env())
///     .slot_matching(SlotMatching::Overlap)
///     .build()?;
/// ```
#[derive(Default)]
pub struct SchedulerBuilder {
    store: Option<Arc<dyn VersionStore>>,
    config: SchedulerConfig,
    retry: Option<RetryPolicy>,
    matching: Option<SlotMatching>,
    audit: Option<Arc<dyn AuditLog>>,
}

impl SchedulerBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `store` as the backend
    pub fn store<S: VersionStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Use an already shared backend
    pub fn shared_store(mut self, store: Arc<dyn VersionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Start from `config`; explicit setters below take precedence
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the retry policy
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Override slot matching
    pub fn slot_matching(mut self, matching: SlotMatching) -> Self {
        self.matching = Some(matching);
        self
    }

    /// Send audit events to `audit`
    pub fn audit_log(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build the scheduler
    ///
    /// Without a store, a fresh [`MemoryStore`] with schedule uniqueness
    /// constraints is used. With auditing disabled in the config, audit
    /// events are discarded even if a log was supplied.
    ///
    /// # Errors
    /// [`Error::Validation`] if the retry policy is invalid.
    pub fn build(self) -> Result<Scheduler> {
        let policy = match self.retry {
            Some(policy) => policy,
            None => self.config.retry.to_policy()?,
        };
        policy.validate()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::with_schedule_constraints()));
        let audit: Arc<dyn AuditLog> = if !self.config.audit_enabled {
            Arc::new(NoopAuditLog)
        } else {
            self.audit
                .unwrap_or_else(|| Arc::new(MemoryAuditLog::new()))
        };
        let matching = self.matching.unwrap_or(self.config.slot_matching);

        debug!(
            max_attempts = policy.max_attempts,
            base_delay_ms = policy.base_delay.as_millis() as u64,
            ?matching,
            audit = self.config.audit_enabled,
            "Scheduler built"
        );

        Ok(Scheduler {
            store,
            retry: RetryCoordinator::new(policy),
            matching,
            audit,
            differ: ChangeDiffer::new(),
        })
    }
}
