// Audit Log Port
// Append-only event sink; best-effort by contract

use crate::error::Result;
use async_trait::async_trait;

/// Audit Log port
///
/// Appends `{event, data, timestamp}` records. Callers treat appends as
/// best-effort: an audit failure must never fail the operation being audited
/// (the executor logs a warning and continues).
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn log(&self, event: &str, data: serde_json::Value) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records events in memory for assertions
    pub struct RecordingAuditLog {
        events: Mutex<Vec<(String, serde_json::Value)>>,
        fail: bool,
    }

    impl RecordingAuditLog {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        /// Sink whose appends always fail (isolation tests)
        pub fn failing() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn events(&self) -> Vec<(String, serde_json::Value)> {
            self.events.lock().unwrap().clone()
        }

        pub fn event_names(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }
    }

    impl Default for RecordingAuditLog {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl AuditLog for RecordingAuditLog {
        async fn log(&self, event: &str, data: serde_json::Value) -> Result<()> {
            if self.fail {
                return Err(crate::error::AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "audit sink unavailable",
                )));
            }
            self.events
                .lock()
                .unwrap()
                .push((event.to_string(), data));
            Ok(())
        }
    }
}
