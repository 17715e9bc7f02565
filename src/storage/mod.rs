//! Storage abstractions for snapshot persistence.
//!
//! The store keeps exactly one snapshot: the record set seen by the last run
//! that reached completion. Overlapping invocations are not coordinated; the
//! last `save` wins.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Snapshot;

// Re-export for convenience
pub use local::LocalStorage;

/// Outcome of reading the persisted snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum StateLoad {
    /// A valid snapshot was read
    Found(Snapshot),
    /// Nothing has been persisted yet
    Missing,
    /// State exists but could not be read or parsed
    Corrupt(String),
}

impl StateLoad {
    /// The snapshot, treating corrupt state the same as a first run.
    pub fn into_snapshot(self) -> Option<Snapshot> {
        match self {
            StateLoad::Found(snapshot) => Some(snapshot),
            StateLoad::Missing | StateLoad::Corrupt(_) => None,
        }
    }
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the last persisted snapshot. Never fails.
    async fn load(&self) -> StateLoad;

    /// Replace the persisted snapshot. Readers never observe a partial write.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}
