// Action Executor
// Fixed catalog of host-mutating operations. Every action follows the same
// protocol: capture snapshot -> build platform command -> run -> audit ->
// structured report. Snapshot capture strictly precedes the mutation; audit
// strictly follows it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::application::{audit_best_effort, AgentConfig};
use crate::domain::{ActionOutcome, ActionReport, SnapshotKind, SnapshotMeta};
use crate::error::Result;
use crate::port::{AuditLog, EnvFileStore, PlatformCommands, ProcessRunner, RunOptions, SnapshotStore};

pub struct ActionExecutor {
    snapshots: Arc<dyn SnapshotStore>,
    runner: Arc<dyn ProcessRunner>,
    audit: Arc<dyn AuditLog>,
    platform: Arc<dyn PlatformCommands>,
    env_file: Arc<dyn EnvFileStore>,
    config: AgentConfig,
    /// Serializes in-process set_env read-merge-write cycles. The
    /// cross-process race on the same file is a documented non-goal.
    env_lock: tokio::sync::Mutex<()>,
}

impl ActionExecutor {
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        runner: Arc<dyn ProcessRunner>,
        audit: Arc<dyn AuditLog>,
        platform: Arc<dyn PlatformCommands>,
        env_file: Arc<dyn EnvFileStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            snapshots,
            runner,
            audit,
            platform,
            env_file,
            config,
            env_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Judged too destructive for unattended execution: captures a snapshot
    /// and returns the upgrade plan without running anything.
    pub async fn upgrade_node(&self) -> Result<ActionReport> {
        let meta = SnapshotMeta::new(json!({ "files": [], "note": "Pre Node upgrade" }));
        let snapshot_id = self.snapshots.capture(SnapshotKind::NodeUpgrade, meta).await?;

        let plan = self.platform.upgrade_node_plan();

        audit_best_effort(
            &self.audit,
            "executor:upgrade_node",
            json!({ "snapshot_id": snapshot_id, "plan": plan, "dry_run": true }),
        )
        .await;

        Ok(ActionReport {
            snapshot_id,
            outcome: ActionOutcome::Planned { plan },
            requires_manual_confirm: true,
        })
    }

    /// Open inbound TCP access on `port` (default: configured service port)
    pub async fn open_firewall(&self, port: Option<u16>) -> Result<ActionReport> {
        let port = port.unwrap_or(self.config.service_port);

        let meta = SnapshotMeta::new(json!({
            "note": format!("Open firewall for port {}", port),
            "port": port,
        }));
        let snapshot_id = self.snapshots.capture(SnapshotKind::FirewallOpen, meta).await?;

        let cmd = self.platform.open_firewall(port);
        info!(port = %port, command = %cmd, "Opening firewall port");
        let run_result = self.runner.run(&cmd, RunOptions::default()).await;

        audit_best_effort(
            &self.audit,
            "executor:open_firewall",
            json!({
                "snapshot_id": snapshot_id,
                "port": port,
                "cmd": cmd,
                "ok": run_result.is_ok(),
            }),
        )
        .await;

        // Snapshot stays valid and referenceable even when the mutation failed
        let output = run_result?;
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };

        Ok(ActionReport {
            snapshot_id,
            outcome: ActionOutcome::Executed { output: text },
            requires_manual_confirm: false,
        })
    }

    /// Terminate whatever process is currently bound to `port`
    pub async fn free_port(&self, port: u16) -> Result<ActionReport> {
        let meta = SnapshotMeta::new(json!({
            "note": format!("Attempt free port {}", port),
            "port": port,
        }));
        let snapshot_id = self.snapshots.capture(SnapshotKind::PortFree, meta).await?;

        let cmd = self.platform.free_port(port);
        info!(port = %port, command = %cmd, "Freeing port");
        let run_result = self.runner.run(&cmd, RunOptions::default()).await;

        audit_best_effort(
            &self.audit,
            "executor:free_port",
            json!({
                "snapshot_id": snapshot_id,
                "port": port,
                "cmd": cmd,
                "ok": run_result.is_ok(),
            }),
        )
        .await;

        let output = run_result?;

        Ok(ActionReport {
            snapshot_id,
            outcome: ActionOutcome::Executed { output: output.stdout },
            requires_manual_confirm: false,
        })
    }

    /// Merge `updates` into the environment file, first-writer-wins:
    /// keys already present are never overwritten.
    pub async fn set_env(&self, updates: BTreeMap<String, String>) -> Result<ActionReport> {
        let _guard = self.env_lock.lock().await;

        let prior = self.env_file.load().await?;
        let file_existed = prior.is_some();
        let prior_entries = prior.unwrap_or_default();

        let meta = SnapshotMeta::new(json!({
            "note": "Set missing env vars",
            "keys": updates.keys().collect::<Vec<_>>(),
            "path": self.config.env_file_path,
            "file_existed": file_existed,
            "prior_entries": prior_entries,
        }));
        let snapshot_id = self.snapshots.capture(SnapshotKind::EnvUpdate, meta).await?;

        let mut merged = prior_entries;
        let mut added = Vec::new();
        let mut skipped = Vec::new();
        for (key, value) in updates {
            if merged.iter().any(|(existing, _)| *existing == key) {
                skipped.push(key);
            } else {
                merged.push((key.clone(), value));
                added.push(key);
            }
        }

        let store_result = self.env_file.store(&merged).await;

        audit_best_effort(
            &self.audit,
            "executor:set_env",
            json!({
                "snapshot_id": snapshot_id,
                "updated": added,
                "skipped": skipped,
                "ok": store_result.is_ok(),
            }),
        )
        .await;

        store_result?;

        Ok(ActionReport {
            snapshot_id,
            outcome: ActionOutcome::EnvUpdated { added, skipped },
            requires_manual_confirm: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SnapshotKind;
    use crate::port::audit_log::mocks::RecordingAuditLog;
    use crate::port::env_file::mocks::InMemoryEnvFile;
    use crate::port::platform::UnixCommands;
    use crate::port::process_runner::mocks::MockProcessRunner;
    use crate::port::process_runner::RunError;
    use crate::port::snapshot_store::mocks::InMemorySnapshotStore;

    struct Harness {
        snapshots: Arc<InMemorySnapshotStore>,
        runner: Arc<MockProcessRunner>,
        audit: Arc<RecordingAuditLog>,
        env_file: Arc<InMemoryEnvFile>,
        executor: ActionExecutor,
    }

    fn harness_with(runner: MockProcessRunner, env_file: InMemoryEnvFile) -> Harness {
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let runner = Arc::new(runner);
        let audit = Arc::new(RecordingAuditLog::new());
        let env_file = Arc::new(env_file);
        let executor = ActionExecutor::new(
            snapshots.clone(),
            runner.clone(),
            audit.clone(),
            Arc::new(UnixCommands),
            env_file.clone(),
            AgentConfig::default(),
        );
        Harness {
            snapshots,
            runner,
            audit,
            env_file,
            executor,
        }
    }

    fn harness() -> Harness {
        harness_with(MockProcessRunner::new(), InMemoryEnvFile::empty())
    }

    #[tokio::test]
    async fn test_upgrade_node_never_runs_commands() {
        let h = harness();

        let report = h.executor.upgrade_node().await.unwrap();

        assert!(report.requires_manual_confirm);
        assert!(matches!(report.outcome, ActionOutcome::Planned { .. }));
        assert_eq!(h.runner.call_count(), 0);

        let snapshot = h.snapshots.find_by_id(&report.snapshot_id).await.unwrap().unwrap();
        assert_eq!(snapshot.kind, SnapshotKind::NodeUpgrade);
    }

    #[tokio::test]
    async fn test_open_firewall_snapshot_and_audit() {
        let h = harness();

        let report = h.executor.open_firewall(Some(8080)).await.unwrap();

        let snapshot = h.snapshots.find_by_id(&report.snapshot_id).await.unwrap().unwrap();
        assert_eq!(snapshot.kind, SnapshotKind::FirewallOpen);
        assert_eq!(snapshot.meta.as_value()["port"], 8080);

        assert!(h.runner.calls()[0].contains("ufw allow 8080/tcp"));

        let events = h.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "executor:open_firewall");
        assert_eq!(events[0].1["snapshot_id"], report.snapshot_id.as_str());
    }

    #[tokio::test]
    async fn test_open_firewall_uses_configured_default_port() {
        let h = harness();

        h.executor.open_firewall(None).await.unwrap();

        assert!(h.runner.calls()[0].contains("5000/tcp"));
    }

    #[tokio::test]
    async fn test_failed_command_surfaces_but_snapshot_remains() {
        let runner = MockProcessRunner::new().on(
            "kill",
            Err(RunError::ProcessFailed {
                exit_code: 1,
                stderr: "operation not permitted".to_string(),
            }),
        );
        let h = harness_with(runner, InMemoryEnvFile::empty());

        let result = h.executor.free_port(3000).await;

        assert!(result.is_err());
        // snapshot captured before the mutation is retained
        assert_eq!(h.snapshots.len(), 1);
        // audit still recorded the failed attempt
        assert_eq!(h.audit.event_names(), vec!["executor:free_port"]);
        assert_eq!(h.audit.events()[0].1["ok"], false);
    }

    #[tokio::test]
    async fn test_capture_failure_aborts_before_mutation() {
        let snapshots = Arc::new(InMemorySnapshotStore::failing());
        let runner = Arc::new(MockProcessRunner::new());
        let executor = ActionExecutor::new(
            snapshots,
            runner.clone(),
            Arc::new(RecordingAuditLog::new()),
            Arc::new(UnixCommands),
            Arc::new(InMemoryEnvFile::empty()),
            AgentConfig::default(),
        );

        let result = executor.open_firewall(Some(8080)).await;

        assert!(result.is_err());
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_set_env_first_writer_wins() {
        let env_file =
            InMemoryEnvFile::with_entries(vec![("A".to_string(), "1".to_string())]);
        let h = harness_with(MockProcessRunner::new(), env_file);

        let mut updates = BTreeMap::new();
        updates.insert("A".to_string(), "2".to_string());
        updates.insert("B".to_string(), "3".to_string());

        let report = h.executor.set_env(updates).await.unwrap();

        match report.outcome {
            ActionOutcome::EnvUpdated { added, skipped } => {
                assert_eq!(added, vec!["B".to_string()]);
                assert_eq!(skipped, vec!["A".to_string()]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let entries = h.env_file.entries().unwrap();
        assert_eq!(
            entries,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_env_snapshot_captures_prior_state() {
        let env_file =
            InMemoryEnvFile::with_entries(vec![("KEEP".to_string(), "x".to_string())]);
        let h = harness_with(MockProcessRunner::new(), env_file);

        let mut updates = BTreeMap::new();
        updates.insert("NEW".to_string(), "y".to_string());

        let report = h.executor.set_env(updates).await.unwrap();
        let snapshot = h.snapshots.find_by_id(&report.snapshot_id).await.unwrap().unwrap();

        assert_eq!(snapshot.kind, SnapshotKind::EnvUpdate);
        assert_eq!(snapshot.meta.as_value()["file_existed"], true);
        assert_eq!(
            snapshot.meta.as_value()["prior_entries"],
            serde_json::json!([["KEEP", "x"]])
        );
    }

    #[tokio::test]
    async fn test_audit_failure_never_fails_the_action() {
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let executor = ActionExecutor::new(
            snapshots,
            Arc::new(MockProcessRunner::new()),
            Arc::new(RecordingAuditLog::failing()),
            Arc::new(UnixCommands),
            Arc::new(InMemoryEnvFile::empty()),
            AgentConfig::default(),
        );

        let report = executor.open_firewall(Some(9999)).await;

        assert!(report.is_ok());
    }
}
