// Snapshot Store Port
// Durable pre-action state records, keyed by collision-resistant ids

use crate::domain::{Snapshot, SnapshotId, SnapshotKind, SnapshotMeta};
use crate::error::Result;
use async_trait::async_trait;

/// Snapshot Store port
///
/// `capture` must be safely callable concurrently by multiple in-flight
/// actions; each snapshot gets its own row/record, so no two captures can
/// overwrite one another. Records are immutable after creation.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a new snapshot and return its id
    ///
    /// # Errors
    /// `AppError::Storage` if the persistence medium is unwritable
    async fn capture(&self, kind: SnapshotKind, meta: SnapshotMeta) -> Result<SnapshotId>;

    /// Look up a snapshot by id
    async fn find_by_id(&self, id: &str) -> Result<Option<Snapshot>>;

    /// Most recent snapshots, newest first
    async fn list_recent(&self, limit: u32) -> Result<Vec<Snapshot>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// In-memory store with deterministic sequential ids
    pub struct InMemorySnapshotStore {
        snapshots: Mutex<HashMap<SnapshotId, Snapshot>>,
        seq: AtomicU64,
        fail_capture: bool,
    }

    impl InMemorySnapshotStore {
        pub fn new() -> Self {
            Self {
                snapshots: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
                fail_capture: false,
            }
        }

        /// Store whose `capture` always fails (capture-precedes-mutation tests)
        pub fn failing() -> Self {
            Self {
                snapshots: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
                fail_capture: true,
            }
        }

        pub fn len(&self) -> usize {
            self.snapshots.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl Default for InMemorySnapshotStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl SnapshotStore for InMemorySnapshotStore {
        async fn capture(&self, kind: SnapshotKind, meta: SnapshotMeta) -> Result<SnapshotId> {
            if self.fail_capture {
                return Err(crate::error::AppError::Storage(
                    "snapshot medium unwritable".to_string(),
                ));
            }

            let seq = self.seq.fetch_add(1, Ordering::SeqCst);
            let created_at = 1_700_000_000_000 + seq as i64;
            let id = format!("{}-{}-{:08}", kind, created_at, seq);

            let snapshot = Snapshot {
                id: id.clone(),
                kind,
                meta,
                created_at,
            };
            self.snapshots.lock().unwrap().insert(id.clone(), snapshot);
            Ok(id)
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<Snapshot>> {
            Ok(self.snapshots.lock().unwrap().get(id).cloned())
        }

        async fn list_recent(&self, limit: u32) -> Result<Vec<Snapshot>> {
            let mut all: Vec<Snapshot> = self.snapshots.lock().unwrap().values().cloned().collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            all.truncate(limit as usize);
            Ok(all)
        }
    }
}
