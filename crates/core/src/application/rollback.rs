// Rollback Registry
// Each snapshot kind maps to a restoration procedure. Kinds without a
// registered handler degrade to the legacy inspect-only response: the
// payload is returned, nothing is restored, and the report says so.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::application::audit_best_effort;
use crate::domain::{Snapshot, SnapshotKind};
use crate::error::{AppError, Result};
use crate::port::{AuditLog, EnvFileStore, PlatformCommands, ProcessRunner, RunOptions, SnapshotStore};

/// What a restoration attempt produced
#[derive(Debug, Clone)]
pub struct RollbackOutcome {
    pub restored: bool,
    pub detail: String,
    pub output: Option<String>,
}

/// Restoration procedure for one snapshot kind
#[async_trait]
pub trait RollbackHandler: Send + Sync {
    async fn restore(&self, snapshot: &Snapshot) -> Result<RollbackOutcome>;
}

/// Caller-facing rollback result: the exact captured snapshot plus the
/// restoration outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackReport {
    pub snapshot: Snapshot,
    pub restored: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

pub struct RollbackService {
    snapshots: Arc<dyn SnapshotStore>,
    audit: Arc<dyn AuditLog>,
    handlers: HashMap<SnapshotKind, Arc<dyn RollbackHandler>>,
}

impl RollbackService {
    pub fn new(snapshots: Arc<dyn SnapshotStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            snapshots,
            audit,
            handlers: HashMap::new(),
        }
    }

    /// Service with the full built-in handler set registered
    pub fn with_default_handlers(
        snapshots: Arc<dyn SnapshotStore>,
        audit: Arc<dyn AuditLog>,
        runner: Arc<dyn ProcessRunner>,
        platform: Arc<dyn PlatformCommands>,
        env_file: Arc<dyn EnvFileStore>,
    ) -> Self {
        let mut service = Self::new(snapshots, audit);
        service.register(SnapshotKind::EnvUpdate, Arc::new(EnvFileRollback { env_file }));
        service.register(
            SnapshotKind::FirewallOpen,
            Arc::new(FirewallRollback { runner, platform }),
        );
        service.register(SnapshotKind::PortFree, Arc::new(PortFreeRollback));
        service.register(SnapshotKind::NodeUpgrade, Arc::new(NodeUpgradeRollback));
        service
    }

    pub fn register(&mut self, kind: SnapshotKind, handler: Arc<dyn RollbackHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Restore the pre-action state recorded under `id`
    ///
    /// # Errors
    /// `AppError::NotFound` when no snapshot exists for `id`
    pub async fn rollback(&self, id: &str) -> Result<RollbackReport> {
        let snapshot = self
            .snapshots
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Snapshot not found: {}", id)))?;

        info!(snapshot_id = %snapshot.id, kind = %snapshot.kind, "Rollback requested");

        let outcome = match self.handlers.get(&snapshot.kind) {
            Some(handler) => handler.restore(&snapshot).await,
            None => Ok(RollbackOutcome {
                restored: false,
                detail: "no restoration procedure registered for this snapshot kind; \
                         payload returned for inspection only"
                    .to_string(),
                output: None,
            }),
        };

        audit_best_effort(
            &self.audit,
            "rollback:attempt",
            json!({
                "snapshot_id": snapshot.id,
                "kind": snapshot.kind,
                "ok": outcome.is_ok(),
                "restored": outcome.as_ref().map(|o| o.restored).unwrap_or(false),
            }),
        )
        .await;

        let outcome = outcome?;

        Ok(RollbackReport {
            snapshot,
            restored: outcome.restored,
            detail: outcome.detail,
            output: outcome.output,
        })
    }
}

/// env_update: rewrite the environment file to its captured prior contents
struct EnvFileRollback {
    env_file: Arc<dyn EnvFileStore>,
}

#[async_trait]
impl RollbackHandler for EnvFileRollback {
    async fn restore(&self, snapshot: &Snapshot) -> Result<RollbackOutcome> {
        let meta = snapshot.meta.as_value();

        let file_existed = meta["file_existed"].as_bool().unwrap_or(false);
        if !file_existed {
            self.env_file.remove().await?;
            return Ok(RollbackOutcome {
                restored: true,
                detail: "environment file removed (did not exist before the action)".to_string(),
                output: None,
            });
        }

        let prior: Vec<(String, String)> = serde_json::from_value(meta["prior_entries"].clone())
            .map_err(|e| {
                AppError::Validation(format!("snapshot meta missing prior_entries: {}", e))
            })?;

        self.env_file.store(&prior).await?;

        Ok(RollbackOutcome {
            restored: true,
            detail: "environment file restored to pre-action contents".to_string(),
            output: None,
        })
    }
}

/// firewall_open: delete the rule the action created
struct FirewallRollback {
    runner: Arc<dyn ProcessRunner>,
    platform: Arc<dyn PlatformCommands>,
}

#[async_trait]
impl RollbackHandler for FirewallRollback {
    async fn restore(&self, snapshot: &Snapshot) -> Result<RollbackOutcome> {
        let port = snapshot.meta.as_value()["port"]
            .as_u64()
            .ok_or_else(|| AppError::Validation("snapshot meta missing port".to_string()))?
            as u16;

        let cmd = self.platform.close_firewall(port);
        let output = self.runner.run(&cmd, RunOptions::default()).await?;

        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };

        Ok(RollbackOutcome {
            restored: true,
            detail: format!("firewall rule for port {} removed", port),
            output: Some(text),
        })
    }
}

/// port_free: a killed process cannot be resurrected
struct PortFreeRollback;

#[async_trait]
impl RollbackHandler for PortFreeRollback {
    async fn restore(&self, _snapshot: &Snapshot) -> Result<RollbackOutcome> {
        Ok(RollbackOutcome {
            restored: false,
            detail: "terminated process cannot be restarted automatically; \
                     snapshot retained for inspection"
                .to_string(),
            output: None,
        })
    }
}

/// node_upgrade: the plan was never auto-executed
struct NodeUpgradeRollback;

#[async_trait]
impl RollbackHandler for NodeUpgradeRollback {
    async fn restore(&self, _snapshot: &Snapshot) -> Result<RollbackOutcome> {
        Ok(RollbackOutcome {
            restored: false,
            detail: "upgrade plan was never auto-executed; nothing to restore".to_string(),
            output: None,
        })
    }
}
