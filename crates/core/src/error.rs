//! Error types for slotguard
//!
//! Failures are a closed set of tagged variants with structured fields.
//! Callers dispatch on the variant (or on [`Error::code`]), never on the
//! rendered message.
//!
//! ## Error Codes (Canonical)
//!
//! These codes are frozen and must not change:
//!
//! | Code | Retryable | Description |
//! |------|-----------|-------------|
//! | VersionConflict | yes | Stored version differed from the expected one at write time |
//! | NotFound | no | Referenced record does not exist |
//! | ConflictDetected | no | Scheduling collision on room, instructor or section |
//! | DuplicateResource | no | Storage uniqueness constraint rejected the write |
//! | ValidationError | no | Malformed or incomplete input |
//! | Unsupported | no | Backend lacks a transaction or read-concern capability |
//! | StorageError | no | Opaque backend failure |

use crate::schedule::ConflictReport;
use crate::types::{RecordId, Version};
use thiserror::Error;

/// Result type alias using slotguard's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in slotguard operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Conditional update lost the race: the record moved on
    #[error("version conflict on {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        /// Record that was being written
        id: RecordId,
        /// Version the writer based its change on
        expected: Version,
        /// Version stored at write time
        actual: Version,
    },

    /// Record does not exist
    #[error("record not found: {id}")]
    NotFound {
        /// Missing record
        id: RecordId,
    },

    /// Scheduling collision found by the conflict detector
    #[error("schedule conflict: {report}")]
    ConflictDetected {
        /// Every colliding dimension and the assignments it collides with
        report: ConflictReport,
    },

    /// Storage-level uniqueness constraint rejected a write
    #[error("duplicate resource: {constraint} already holds {value}")]
    DuplicateResource {
        /// Name of the violated constraint
        constraint: String,
        /// Rendered duplicate key
        value: String,
    },

    /// Malformed or incomplete input
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// Backend cannot provide a requested capability
    #[error("unsupported by backend: {capability}")]
    Unsupported {
        /// Capability name, e.g. "snapshot transactions"
        capability: String,
    },

    /// Opaque backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Shorthand for a [`Error::Validation`]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`]
    pub fn not_found(id: &RecordId) -> Self {
        Error::NotFound { id: id.clone() }
    }

    /// Shorthand for a [`Error::Unsupported`]
    pub fn unsupported(capability: impl Into<String>) -> Self {
        Error::Unsupported {
            capability: capability.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only version conflicts may succeed on retry with fresh data; retrying
    /// anything else cannot change the outcome.
    pub fn is_retryable(&self) -> bool {
        self.is_version_conflict()
    }

    /// Check if this is a version conflict.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Error::VersionConflict { .. })
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is a scheduling conflict.
    pub fn is_schedule_conflict(&self) -> bool {
        matches!(self, Error::ConflictDetected { .. })
    }

    /// Check if the backend reported a missing capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }

    /// Canonical, frozen error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::VersionConflict { .. } => "VersionConflict",
            Error::NotFound { .. } => "NotFound",
            Error::ConflictDetected { .. } => "ConflictDetected",
            Error::DuplicateResource { .. } => "DuplicateResource",
            Error::Validation { .. } => "ValidationError",
            Error::Unsupported { .. } => "Unsupported",
            Error::Storage(_) => "StorageError",
        }
    }

    /// Message suitable for showing to the person who triggered the operation
    pub fn user_message(&self) -> String {
        match self {
            Error::VersionConflict { id, .. } => format!(
                "Record {} was modified by someone else. Please refresh and retry.",
                id
            ),
            Error::NotFound { id } => format!("Record {} no longer exists.", id),
            Error::ConflictDetected { report } => {
                format!("The requested slot is already taken: {}.", report)
            }
            Error::DuplicateResource { value, .. } => {
                format!("A resource with {} already exists.", value)
            }
            Error::Validation { field, message } => format!("Invalid {}: {}.", field, message),
            Error::Unsupported { .. } | Error::Storage(_) => {
                "The storage backend is unavailable. Please try again later.".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::validation("payload", e.to_string())
    }
}
