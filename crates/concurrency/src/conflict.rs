//! Schedule conflict detection
//!
//! Checks a candidate slot against existing active assignments along three
//! independent dimensions: room, instructor and section, each on the same
//! day and time.
//!
//! ## Known limitation
//!
//! Check-then-insert is racy. Two concurrent creations can both pass the
//! check before either writes. This detector is the fast, user-facing path;
//! the store's uniqueness constraints on `(room, day, time)` and
//! `(instructor, day, time)` are the mutual-exclusion mechanism. Re-checking
//! in a loop would only narrow the window, so it is not done here.

use slotguard_core::schedule::fields;
use slotguard_core::{
    ConflictKind, ConflictReport, Error, Filter, ResourceKind, Result, ScheduleAssignment,
    ScheduleCandidate, SlotMatching, TimeRange, VersionedRecord,
};
use slotguard_storage::VersionStore;
use tracing::warn;

/// What to do when a check finds collisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Fail with [`Error::ConflictDetected`]
    #[default]
    Reject,
    /// Caller explicitly chose to proceed anyway
    Override,
}

/// Finds active assignments that collide with a candidate slot
///
/// Constructed per request; holds no state between checks.
pub struct ConflictDetector<'a, S: ?Sized> {
    store: &'a S,
    matching: SlotMatching,
}

impl<'a, S: VersionStore + ?Sized> ConflictDetector<'a, S> {
    /// Detector using exact time-string matching
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            matching: SlotMatching::Exact,
        }
    }

    /// Choose how time slots are compared
    pub fn with_matching(mut self, matching: SlotMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Collect collisions along all three dimensions
    ///
    /// An empty report means the slot is free.
    pub async fn check(&self, candidate: &ScheduleCandidate) -> Result<ConflictReport> {
        validate_candidate(candidate)?;
        let requested = match self.matching {
            SlotMatching::Exact => None,
            SlotMatching::Overlap => Some(candidate.time.parse::<TimeRange>()?),
        };

        let mut report = ConflictReport::default();
        for kind in ConflictKind::ALL {
            let colliding = self.colliding(kind, candidate, requested.as_ref()).await?;
            report.push(kind, colliding);
        }
        Ok(report)
    }

    /// Check and apply `policy`
    ///
    /// # Errors
    /// [`Error::ConflictDetected`] when any dimension collides and `policy`
    /// is [`ConflictPolicy::Reject`].
    pub async fn ensure_clear(
        &self,
        candidate: &ScheduleCandidate,
        policy: ConflictPolicy,
    ) -> Result<ConflictReport> {
        let report = self.check(candidate).await?;
        if report.is_clear() {
            return Ok(report);
        }
        warn!(
            room = %candidate.room,
            day = %candidate.day,
            time = %candidate.time,
            dimensions = ?report.kinds(),
            overridden = policy == ConflictPolicy::Override,
            "Schedule conflict detected"
        );
        match policy {
            ConflictPolicy::Reject => Err(Error::ConflictDetected { report }),
            ConflictPolicy::Override => Ok(report),
        }
    }

    async fn colliding(
        &self,
        kind: ConflictKind,
        candidate: &ScheduleCandidate,
        requested: Option<&TimeRange>,
    ) -> Result<Vec<ScheduleAssignment>> {
        let mut filter = Filter::new(ResourceKind::Schedule)
            .eq(kind.field(), kind.value_of(candidate))
            .eq(fields::DAY, candidate.day.as_str())
            .excluding(candidate.exclude_id.clone());
        if requested.is_none() {
            filter = filter.eq(fields::TIME, candidate.time.as_str());
        }

        let records = self.store.find(&filter).await?;
        records
            .iter()
            .filter(|record| match requested {
                None => true,
                Some(range) => occupies(record, range, &candidate.time),
            })
            .map(decode)
            .collect()
    }
}

fn validate_candidate(candidate: &ScheduleCandidate) -> Result<()> {
    for (name, value) in [
        (fields::ROOM, &candidate.room),
        (fields::DAY, &candidate.day),
        (fields::TIME, &candidate.time),
        (fields::INSTRUCTOR, &candidate.instructor),
        (fields::SECTION, &candidate.section),
    ] {
        if value.trim().is_empty() {
            return Err(Error::validation(name, "must not be empty"));
        }
    }
    Ok(())
}

/// Whether `record`'s time range intersects `range`
///
/// Stored times that don't parse fall back to exact string comparison.
fn occupies(record: &VersionedRecord, range: &TimeRange, raw: &str) -> bool {
    match record.str_field(fields::TIME) {
        Some(stored) => match stored.parse::<TimeRange>() {
            Ok(existing) => existing.overlaps(range),
            Err(_) => stored == raw,
        },
        None => false,
    }
}

/// Every filter match is a collision; one that cannot be decoded fails the
/// check rather than being dropped from the report.
fn decode(record: &VersionedRecord) -> Result<ScheduleAssignment> {
    ScheduleAssignment::from_record(record).map_err(|e| {
        warn!(record_id = %record.id, error = %e, "Undecodable schedule record matched a conflict filter");
        Error::Storage(format!("schedule record {} is malformed: {}", record.id, e))
    })
}
