// Environment File Port
// Key/value persistence for the agent's .env-style configuration file

use crate::error::Result;
use async_trait::async_trait;

/// Environment File Store port
///
/// Entries preserve file order. `load` distinguishes a missing file (`None`)
/// from an empty one so rollback can restore either state exactly.
///
/// This port only moves whole snapshots of the file; merge policy
/// (first-writer-wins) lives in the executor.
#[async_trait]
pub trait EnvFileStore: Send + Sync {
    /// Read all entries, or None if the file does not exist
    async fn load(&self) -> Result<Option<Vec<(String, String)>>>;

    /// Replace the file contents with the given entries (atomic)
    async fn store(&self, entries: &[(String, String)]) -> Result<()>;

    /// Remove the file (used to restore the never-existed state)
    async fn remove(&self) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// In-memory env file (None = file absent)
    pub struct InMemoryEnvFile {
        contents: Mutex<Option<Vec<(String, String)>>>,
    }

    impl InMemoryEnvFile {
        pub fn empty() -> Self {
            Self {
                contents: Mutex::new(None),
            }
        }

        pub fn with_entries(entries: Vec<(String, String)>) -> Self {
            Self {
                contents: Mutex::new(Some(entries)),
            }
        }

        pub fn entries(&self) -> Option<Vec<(String, String)>> {
            self.contents.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EnvFileStore for InMemoryEnvFile {
        async fn load(&self) -> Result<Option<Vec<(String, String)>>> {
            Ok(self.contents.lock().unwrap().clone())
        }

        async fn store(&self, entries: &[(String, String)]) -> Result<()> {
            *self.contents.lock().unwrap() = Some(entries.to_vec());
            Ok(())
        }

        async fn remove(&self) -> Result<()> {
            *self.contents.lock().unwrap() = None;
            Ok(())
        }
    }
}
