//! Persistence interface for threads.
//!
//! The reconciler never talks to a database directly; it goes through
//! `ThreadStore`, implemented over Postgres. Tests use an in-memory store
//! that enforces the same uniqueness rules.

#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemoryThreadStore;
pub use postgres::PgThreadStore;

use crate::error::BridgeResult;
use async_trait::async_trait;
use shared_types::{NewThread, Thread, ThreadHandle, ThreadKind};

/// Result of an insert-if-absent keyed on `(kind, target)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written
    Inserted(Thread),
    /// Another writer got there first; this is their row
    Existing(Thread),
}

/// Thread persistence.
///
/// Lookups return `Ok(None)` on a miss; a miss is an expected outcome, not an
/// error. Implementations must reject a second row with the same
/// `(kind, target)` or the same `thread_handle`.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn find_by_target(&self, kind: ThreadKind, target: &str) -> BridgeResult<Option<Thread>>;

    async fn find_by_handle(&self, handle: ThreadHandle) -> BridgeResult<Option<Thread>>;

    /// Atomic conditional insert. On a `(kind, target)` conflict the already
    /// stored row is returned as `InsertOutcome::Existing`.
    async fn insert_if_absent(&self, new: NewThread) -> BridgeResult<InsertOutcome>;

    /// Overwrite `last_subject`/`last_message_ref` for the thread. Fails with
    /// `NotFound` when no row has this handle.
    async fn update_metadata(
        &self,
        handle: ThreadHandle,
        subject: &str,
        message_ref: &str,
    ) -> BridgeResult<()>;
}
