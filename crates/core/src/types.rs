//! Core identifier types for slotguard
//!
//! This module defines the identifiers used throughout the system:
//! - [`RecordId`]: Opaque identifier of a stored record
//! - [`Version`]: Per-record optimistic concurrency version
//! - [`ResourceKind`]: Which scheduling collection a record belongs to
//! - [`TransactionId`]: Unique identifier for a logical transaction
//! - [`UserId`]: Actor that initiated an operation

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a stored record
///
/// The backend decides the format. Records created through the reference
/// store get a random UUID v4 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new random RecordId
    ///
    /// # Examples
    ///
    /// ```
    /// use slotguard_core::RecordId;
    ///
    /// let id1 = RecordId::generate();
    /// let id2 = RecordId::generate();
    /// assert_ne!(id1, id2);
    /// ```
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId(id)
    }
}

/// Optimistic concurrency version of a record
///
/// Starts at [`Version::INITIAL`] on insert and increases by exactly one per
/// successful write. Never decreases, never repeats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    /// Version assigned to a freshly inserted record
    pub const INITIAL: Version = Version(1);

    /// The version a successful write against `self` produces
    ///
    /// # Examples
    ///
    /// ```
    /// use slotguard_core::Version;
    ///
    /// assert_eq!(Version(4).next(), Version(5));
    /// ```
    pub fn next(self) -> Version {
        Version(self.0 + 1)
    }

    /// Raw counter value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(v: u64) -> Self {
        Version(v)
    }
}

/// Scheduling resource collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Physical rooms
    Room,
    /// Class sections (student cohorts)
    Section,
    /// Teaching staff
    Instructor,
    /// Class schedule assignments
    Schedule,
}

impl ResourceKind {
    /// All resource kinds, in a stable order
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Room,
        ResourceKind::Section,
        ResourceKind::Instructor,
        ResourceKind::Schedule,
    ];

    /// Collection name used in logs and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Room => "room",
            ResourceKind::Section => "section",
            ResourceKind::Instructor => "instructor",
            ResourceKind::Schedule => "schedule",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier for a logical transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create a new random TransactionId using UUID v4
    pub fn new() -> Self {
        TransactionId(Uuid::new_v4())
    }

    /// Access the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Actor that initiated an operation
///
/// Background jobs and cascades run as [`UserId::system`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    const SYSTEM: &'static str = "system";

    /// Wrap a user identifier
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    /// The sentinel actor for system-initiated work
    pub fn system() -> Self {
        UserId(Self::SYSTEM.to_string())
    }

    /// Whether this is the system sentinel
    pub fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_string())
    }
}
