//! The storage contract consumed by the concurrency layer
//!
//! [`VersionStore::conditional_update`] is the primitive everything else
//! relies on to prevent lost updates. It must be atomic with respect to the
//! read-version, check, write sequence: a backend that reads the version and
//! then issues an unconditional write reintroduces the race. Backends either
//! expose a native conditional write or wrap the read and the write in one
//! backend transaction.
//!
//! Read sessions and read concerns are optional capabilities. The default
//! implementations report [`Error::Unsupported`] so that callers can degrade.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slotguard_core::{
    Error, Filter, Patch, Payload, RecordId, ResourceKind, Result, Version, VersionedRecord,
};
use std::sync::Arc;

/// Isolation level requested for a read session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadIsolation {
    /// Point-in-time view of all records
    Snapshot,
    /// Snapshot plus serializable validation
    Serializable,
}

/// Consistency requested for a single read outside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadConcern {
    /// Whatever the contacted node has; no guarantee
    Local,
    /// Data acknowledged by a majority of replicas
    Majority,
}

/// A record store with optimistic concurrency control
///
/// Versions start at [`Version::INITIAL`] and increase by exactly one per
/// successful write. Among concurrent conditional writes against the same
/// record and version, at most one succeeds; the rest observe
/// [`Error::VersionConflict`].
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Point read
    ///
    /// # Errors
    /// [`Error::NotFound`] if the record does not exist.
    async fn get(&self, id: &RecordId) -> Result<VersionedRecord>;

    /// Filtered read, ordered by record id
    async fn find(&self, filter: &Filter) -> Result<Vec<VersionedRecord>>;

    /// Create a record at [`Version::INITIAL`]
    ///
    /// A generated id is used when `id` is `None`.
    ///
    /// # Errors
    /// [`Error::DuplicateResource`] if the id exists or a uniqueness
    /// constraint rejects the payload.
    async fn insert(
        &self,
        kind: ResourceKind,
        id: Option<RecordId>,
        payload: Payload,
    ) -> Result<VersionedRecord>;

    /// Compare-and-swap on the record version
    ///
    /// Applies `patch` only if the stored version equals `expected`, and
    /// returns the record at `expected + 1`.
    ///
    /// # Errors
    /// - [`Error::VersionConflict`] on a version mismatch
    /// - [`Error::NotFound`] if the record does not exist
    /// - [`Error::DuplicateResource`] if a uniqueness constraint rejects the result
    async fn conditional_update(
        &self,
        id: &RecordId,
        expected: Version,
        patch: &Patch,
    ) -> Result<VersionedRecord>;

    /// Hard delete, guarded by the same version check
    ///
    /// Returns the record as it was before removal.
    async fn delete(&self, id: &RecordId, expected: Version) -> Result<VersionedRecord>;

    /// Open a read-only session at the requested isolation
    async fn begin_read_session(&self, isolation: ReadIsolation) -> Result<Box<dyn ReadSession>> {
        Err(Error::unsupported(format!("{:?} read sessions", isolation)))
    }

    /// Point read at the requested consistency
    async fn get_with_concern(&self, id: &RecordId, concern: ReadConcern) -> Result<VersionedRecord> {
        match concern {
            ReadConcern::Local => self.get(id).await,
            ReadConcern::Majority => Err(Error::unsupported("majority read concern")),
        }
    }
}

/// A read-only backend transaction
#[async_trait]
pub trait ReadSession: Send {
    /// Read a record inside the session
    async fn get(&mut self, id: &RecordId) -> Result<VersionedRecord>;

    /// End the session; no further reads are allowed
    async fn commit(&mut self) -> Result<()>;
}

#[async_trait]
impl<S: VersionStore + ?Sized> VersionStore for Arc<S> {
    async fn get(&self, id: &RecordId) -> Result<VersionedRecord> {
        (**self).get(id).await
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<VersionedRecord>> {
        (**self).find(filter).await
    }

    async fn insert(
        &self,
        kind: ResourceKind,
        id: Option<RecordId>,
        payload: Payload,
    ) -> Result<VersionedRecord> {
        (**self).insert(kind, id, payload).await
    }

    async fn conditional_update(
        &self,
        id: &RecordId,
        expected: Version,
        patch: &Patch,
    ) -> Result<VersionedRecord> {
        (**self).conditional_update(id, expected, patch).await
    }

    async fn delete(&self, id: &RecordId, expected: Version) -> Result<VersionedRecord> {
        (**self).delete(id, expected).await
    }

    async fn begin_read_session(&self, isolation: ReadIsolation) -> Result<Box<dyn ReadSession>> {
        (**self).begin_read_session(isolation).await
    }

    async fn get_with_concern(&self, id: &RecordId, concern: ReadConcern) -> Result<VersionedRecord> {
        (**self).get_with_concern(id, concern).await
    }
}
