//! Strongest-available consistent reads
//!
//! Not every backend topology supports multi-statement transactions. The
//! reader prefers a snapshot session, falls back to a majority read, and
//! finally to a plain read, so callers always get a value when one exists.
//!
//! ```text
//! Snapshot session  --unavailable-->  Majority read  --unavailable-->  Plain get
//! ```
//!
//! A [`Error::NotFound`] from any tier is authoritative and returned as is.
//! Every other failure moves on to the next tier.

use serde::{Deserialize, Serialize};
use slotguard_core::{Error, RecordId, Result, VersionedRecord};
use slotguard_storage::{ReadConcern, ReadIsolation, VersionStore};
use tracing::{debug, warn};

/// Which consistency level served a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadTier {
    /// Read inside a snapshot-isolated session
    Snapshot,
    /// Majority read concern
    Majority,
    /// Plain read with no consistency guarantee
    Plain,
}

/// Degrading consistent reader over a [`VersionStore`]
pub struct SnapshotReader<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: VersionStore + ?Sized> SnapshotReader<'a, S> {
    /// Reader over `store`
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Read `id` at the strongest consistency the backend offers
    pub async fn read_consistent(&self, id: &RecordId) -> Result<VersionedRecord> {
        self.read_consistent_with_tier(id)
            .await
            .map(|(record, _)| record)
    }

    /// Like [`read_consistent`](Self::read_consistent), also reporting the
    /// tier that served the read
    pub async fn read_consistent_with_tier(
        &self,
        id: &RecordId,
    ) -> Result<(VersionedRecord, ReadTier)> {
        match self.read_in_session(id).await {
            Ok(record) => return Ok((record, ReadTier::Snapshot)),
            Err(e) if e.is_not_found() => return Err(e),
            Err(e) => degrade(id, ReadTier::Snapshot, &e),
        }

        match self.store.get_with_concern(id, ReadConcern::Majority).await {
            Ok(record) => return Ok((record, ReadTier::Majority)),
            Err(e) if e.is_not_found() => return Err(e),
            Err(e) => degrade(id, ReadTier::Majority, &e),
        }

        let record = self.store.get(id).await?;
        Ok((record, ReadTier::Plain))
    }

    async fn read_in_session(&self, id: &RecordId) -> Result<VersionedRecord> {
        let mut session = self.store.begin_read_session(ReadIsolation::Snapshot).await?;
        let record = session.get(id).await;
        // Read-only session: a failed commit does not invalidate what was read
        if let Err(e) = session.commit().await {
            debug!(record_id = %id, error = %e, "Read session commit failed");
        }
        record
    }
}

fn degrade(id: &RecordId, tier: ReadTier, error: &Error) {
    if error.is_unsupported() {
        debug!(record_id = %id, ?tier, reason = %error, "Read tier unavailable, degrading");
    } else {
        warn!(record_id = %id, ?tier, error = %error, "Read tier failed, degrading");
    }
}
