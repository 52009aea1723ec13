// JSONL Audit Sink
// Append-only `{event, data, timestamp}` lines. Appends serialize on an
// async mutex so concurrent events never interleave within a line.

use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use opsmedic_core::error::Result;
use opsmedic_core::port::{AuditLog, TimeProvider};

pub struct JsonlAuditLog {
    path: PathBuf,
    time_provider: Arc<dyn TimeProvider>,
    lock: tokio::sync::Mutex<()>,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            path: path.into(),
            time_provider,
            lock: tokio::sync::Mutex::new(()),
        }
    }
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn log(&self, event: &str, data: serde_json::Value) -> Result<()> {
        let record = json!({
            "event": event,
            "data": data,
            "timestamp": self.time_provider.now_millis(),
        });
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;

        Ok(())
    }
}
