//! Optimistic Concurrency Integration Tests
//!
//! End-to-end behaviour of the scheduler over the in-memory store:
//! lost-update prevention, versioning, retry, schedule conflicts, batches,
//! change diffs and consistent reads.

mod common;

mod bulk;
mod conflicts;
mod diff;
mod lost_update;
mod retry;
mod snapshot;
mod versioning;
