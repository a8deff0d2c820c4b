//! In-memory reference backend
//!
//! # Design
//!
//! - DashMap keyed by [`ResourceKind`]: one shard per collection
//! - FxHashMap inside each shard: O(1) lookups by record id
//! - An id -> kind index so point reads don't scan every shard
//!
//! Every write holds its collection's shard exclusively for the whole
//! version check, uniqueness check and write, which makes
//! `conditional_update` a true compare-and-swap. Uniqueness constraints are
//! per collection, so they are also evaluated under that one guard.
//!
//! Writers additionally take the snapshot gate in shared mode; taking a
//! snapshot takes it exclusively, so a snapshot never observes half of a
//! write and writers to different collections never contend with each other.

use crate::constraint::UniqueConstraint;
use crate::traits::{ReadConcern, ReadIsolation, ReadSession, VersionStore};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use slotguard_core::{
    Error, Filter, Patch, Payload, RecordId, ResourceKind, Result, Version, VersionedRecord,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Optional capabilities a deployment topology may lack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// Multi-statement (snapshot/serializable) read sessions
    pub transactions: bool,
    /// Majority read concern
    pub majority_reads: bool,
}

impl StoreCapabilities {
    /// Everything supported (a replica set)
    pub fn full() -> Self {
        Self {
            transactions: true,
            majority_reads: true,
        }
    }

    /// Plain reads only (a standalone node)
    pub fn standalone() -> Self {
        Self {
            transactions: false,
            majority_reads: false,
        }
    }
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Records of one collection
#[derive(Debug, Clone, Default)]
struct Shard {
    data: FxHashMap<RecordId, VersionedRecord>,
}

impl Shard {
    fn check_unique(&self, constraints: &[UniqueConstraint], candidate: &VersionedRecord) -> Result<()> {
        for constraint in constraints {
            let Some(key) = constraint.key_of(candidate) else {
                continue;
            };
            let taken = self.data.values().any(|other| {
                other.id != candidate.id && constraint.key_of(other).as_deref() == Some(&key[..])
            });
            if taken {
                return Err(Error::DuplicateResource {
                    constraint: constraint.name.clone(),
                    value: constraint.describe(&key),
                });
            }
        }
        Ok(())
    }
}

/// Sharded in-memory [`VersionStore`]
///
/// # Example
///
/// ```ignore
/// use slotguard_storage::{MemoryStore, VersionStore};
///
/// let store = MemoryStore::with_schedule_constraints();
/// let room = store.insert(ResourceKind::Room, None, payload).await?;
/// store.conditional_update(&room.id, room.version, &patch).await?;
/// ```
pub struct MemoryStore {
    shards: DashMap<ResourceKind, Shard>,
    index: DashMap<RecordId, ResourceKind>,
    constraints: RwLock<Vec<UniqueConstraint>>,
    capabilities: RwLock<StoreCapabilities>,
    snapshot_gate: RwLock<()>,
    /// Successful writes across all collections
    commits: AtomicU64,
}

impl MemoryStore {
    /// Empty store with every capability and no constraints
    pub fn new() -> Self {
        Self {
            shards: DashMap::new(),
            index: DashMap::new(),
            constraints: RwLock::new(Vec::new()),
            capabilities: RwLock::new(StoreCapabilities::full()),
            snapshot_gate: RwLock::new(()),
            commits: AtomicU64::new(0),
        }
    }

    /// Store with room-slot, instructor-slot and room-name uniqueness
    pub fn with_schedule_constraints() -> Self {
        let store = Self::new();
        store.add_constraint(UniqueConstraint::schedule_room_slot());
        store.add_constraint(UniqueConstraint::schedule_instructor_slot());
        store.add_constraint(UniqueConstraint::room_name());
        store
    }

    /// Builder-style capability override
    pub fn with_capabilities(self, capabilities: StoreCapabilities) -> Self {
        self.set_capabilities(capabilities);
        self
    }

    /// Register a uniqueness constraint for subsequent writes
    pub fn add_constraint(&self, constraint: UniqueConstraint) {
        debug!(constraint = %constraint.name, kind = %constraint.kind, "Registered unique constraint");
        self.constraints.write().push(constraint);
    }

    /// Change the simulated deployment topology
    pub fn set_capabilities(&self, capabilities: StoreCapabilities) {
        *self.capabilities.write() = capabilities;
    }

    /// Current simulated capabilities
    pub fn capabilities(&self) -> StoreCapabilities {
        *self.capabilities.read()
    }

    /// Number of successful writes so far
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    /// Total records across all collections, archived included
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.data.len()).sum()
    }

    /// True if no records are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn constraints_for(&self, kind: ResourceKind) -> Vec<UniqueConstraint> {
        self.constraints
            .read()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    fn kind_of(&self, id: &RecordId) -> Result<ResourceKind> {
        self.index
            .get(id)
            .map(|entry| *entry.value())
            .ok_or_else(|| Error::not_found(id))
    }

    fn read_local(&self, id: &RecordId) -> Result<VersionedRecord> {
        let kind = self.kind_of(id)?;
        self.shards
            .get(&kind)
            .and_then(|shard| shard.data.get(id).cloned())
            .ok_or_else(|| Error::not_found(id))
    }

    /// Point-in-time copy of every record
    pub fn snapshot(&self) -> MemorySnapshot {
        let _gate = self.snapshot_gate.write();
        let records = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .data
                    .iter()
                    .map(|(id, record)| (id.clone(), record.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        MemorySnapshot {
            records,
            commit_count: self.commits.load(Ordering::Acquire),
            open: true,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VersionStore for MemoryStore {
    async fn get(&self, id: &RecordId) -> Result<VersionedRecord> {
        self.read_local(id)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<VersionedRecord>> {
        let mut results: Vec<VersionedRecord> = self
            .shards
            .get(&filter.kind)
            .map(|shard| {
                shard
                    .data
                    .values()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Sort for consistent ordering
        results.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(results)
    }

    async fn insert(
        &self,
        kind: ResourceKind,
        id: Option<RecordId>,
        payload: Payload,
    ) -> Result<VersionedRecord> {
        let id = id.unwrap_or_else(RecordId::generate);
        let record = VersionedRecord::new(id.clone(), kind, payload, Utc::now());
        let constraints = self.constraints_for(kind);

        let _gate = self.snapshot_gate.read();
        let mut shard = self.shards.entry(kind).or_default();
        // The id is reserved across every kind while the shard guard is held
        let slot = match self.index.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(Error::DuplicateResource {
                    constraint: "primary_key".to_string(),
                    value: format!("id={}", id),
                })
            }
            Entry::Vacant(slot) => slot,
        };
        shard.check_unique(&constraints, &record)?;
        shard.data.insert(id, record.clone());
        slot.insert(kind);
        self.commits.fetch_add(1, Ordering::AcqRel);

        trace!(record_id = %record.id, kind = %kind, "Inserted record");
        Ok(record)
    }

    async fn conditional_update(
        &self,
        id: &RecordId,
        expected: Version,
        patch: &Patch,
    ) -> Result<VersionedRecord> {
        let kind = self.kind_of(id)?;
        let constraints = self.constraints_for(kind);

        let _gate = self.snapshot_gate.read();
        let mut shard = self.shards.get_mut(&kind).ok_or_else(|| Error::not_found(id))?;
        let current = shard.data.get(id).ok_or_else(|| Error::not_found(id))?;
        if current.version != expected {
            return Err(Error::VersionConflict {
                id: id.clone(),
                expected,
                actual: current.version,
            });
        }

        let next = current.apply(patch, Utc::now());
        shard.check_unique(&constraints, &next)?;
        shard.data.insert(id.clone(), next.clone());
        self.commits.fetch_add(1, Ordering::AcqRel);

        trace!(record_id = %id, version = %next.version, "Conditional update applied");
        Ok(next)
    }

    async fn delete(&self, id: &RecordId, expected: Version) -> Result<VersionedRecord> {
        let kind = self.kind_of(id)?;

        let _gate = self.snapshot_gate.read();
        let mut shard = self.shards.get_mut(&kind).ok_or_else(|| Error::not_found(id))?;
        let current = shard.data.get(id).ok_or_else(|| Error::not_found(id))?;
        if current.version != expected {
            return Err(Error::VersionConflict {
                id: id.clone(),
                expected,
                actual: current.version,
            });
        }
        let removed = shard.data.remove(id).ok_or_else(|| Error::not_found(id))?;
        self.index.remove(id);
        self.commits.fetch_add(1, Ordering::AcqRel);

        trace!(record_id = %id, "Deleted record");
        Ok(removed)
    }

    async fn begin_read_session(&self, isolation: ReadIsolation) -> Result<Box<dyn ReadSession>> {
        if !self.capabilities().transactions {
            return Err(Error::unsupported(format!(
                "{:?} transactions on a standalone topology",
                isolation
            )));
        }
        Ok(Box::new(self.snapshot()))
    }

    async fn get_with_concern(&self, id: &RecordId, concern: ReadConcern) -> Result<VersionedRecord> {
        if concern == ReadConcern::Majority && !self.capabilities().majority_reads {
            return Err(Error::unsupported("majority read concern"));
        }
        self.read_local(id)
    }
}

/// Cloned point-in-time view of a [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    records: FxHashMap<RecordId, VersionedRecord>,
    commit_count: u64,
    open: bool,
}

impl MemorySnapshot {
    /// Writes the store had applied when the snapshot was taken
    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    /// Records in the snapshot
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the snapshot holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ReadSession for MemorySnapshot {
    async fn get(&mut self, id: &RecordId) -> Result<VersionedRecord> {
        if !self.open {
            return Err(Error::Storage("read session already committed".to_string()));
        }
        self.records.get(id).cloned().ok_or_else(|| Error::not_found(id))
    }

    async fn commit(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }
}
