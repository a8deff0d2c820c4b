//! Storage layer for slotguard
//!
//! This crate defines the storage contract the concurrency layer consumes
//! and ships a reference backend:
//! - [`VersionStore`]: point/filtered reads, inserts, atomic conditional update, guarded delete
//! - [`ReadSession`], [`ReadIsolation`], [`ReadConcern`]: optional consistency capabilities
//! - [`UniqueConstraint`]: storage-enforced exclusivity (the real double-booking guard)
//! - [`MemoryStore`]: sharded in-memory implementation with simulated topologies

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constraint;
pub mod memory;
pub mod traits;

pub use constraint::UniqueConstraint;
pub use memory::{MemorySnapshot, MemoryStore, StoreCapabilities};
pub use traits::{ReadConcern, ReadIsolation, ReadSession, VersionStore};
