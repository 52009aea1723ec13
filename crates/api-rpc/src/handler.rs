//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::{permission_required, to_rpc_error};
use crate::types::{
    DiagnosticsRequest, ExecuteRequest, PlanRequest, PlanResponse, RollbackRequest,
    SnapshotsRequest, SnapshotsResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use opsmedic_core::application::{
    audit_best_effort, planner, ActionExecutor, AgentConfig, DiagnosticsEngine, RollbackReport,
    RollbackService,
};
use opsmedic_core::domain::DiagnosticsReport;
use opsmedic_core::error::AppError;
use opsmedic_core::port::{AuditLog, PlatformCommands, ProcessRunner, RunOptions, SnapshotStore};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

const DEFAULT_PING_HOST: &str = "8.8.8.8";
const DEFAULT_PING_COUNT: u32 = 4;
const DEFAULT_LOOKUP_DOMAIN: &str = "example.com";
const PING_TIMEOUT_MS: u64 = 8_000;
const LOOKUP_TIMEOUT_MS: u64 = 8_000;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    executor: Arc<ActionExecutor>,
    diagnostics: Arc<DiagnosticsEngine>,
    rollback: Arc<RollbackService>,
    snapshots: Arc<dyn SnapshotStore>,
    runner: Arc<dyn ProcessRunner>,
    platform: Arc<dyn PlatformCommands>,
    audit: Arc<dyn AuditLog>,
    config: AgentConfig,
}

impl RpcHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        executor: Arc<ActionExecutor>,
        diagnostics: Arc<DiagnosticsEngine>,
        rollback: Arc<RollbackService>,
        snapshots: Arc<dyn SnapshotStore>,
        runner: Arc<dyn ProcessRunner>,
        platform: Arc<dyn PlatformCommands>,
        audit: Arc<dyn AuditLog>,
        config: AgentConfig,
    ) -> Self {
        Self {
            executor,
            diagnostics,
            rollback,
            snapshots,
            runner,
            platform,
            audit,
            config,
        }
    }

    /// agent.plan.v1
    pub async fn plan(&self, params: PlanRequest) -> Result<PlanResponse, ErrorObjectOwned> {
        let proposed = planner::propose(&params.message, &self.config);

        audit_best_effort(
            &self.audit,
            "plan:proposed",
            json!({ "message": params.message, "plan": proposed.plan }),
        )
        .await;

        Ok(PlanResponse {
            plan: proposed.plan,
            needs_permission: proposed.needs_permission,
            permission_prompt: proposed.permission_prompt,
        })
    }

    /// agent.execute.v1
    pub async fn execute(
        &self,
        params: ExecuteRequest,
    ) -> Result<serde_json::Value, ErrorObjectOwned> {
        if !params.permission {
            return Err(permission_required());
        }

        info!(tool = %params.tool, "Executing tool");

        let result = self.dispatch(&params.tool, &params.args).await?;

        audit_best_effort(
            &self.audit,
            "execute:completed",
            json!({ "tool": params.tool, "args": params.args }),
        )
        .await;

        Ok(result)
    }

    async fn dispatch(
        &self,
        tool: &str,
        args: &serde_json::Value,
    ) -> Result<serde_json::Value, ErrorObjectOwned> {
        match tool {
            "ping" => {
                let host = args["host"].as_str().unwrap_or(DEFAULT_PING_HOST);
                let count = args["count"].as_u64().unwrap_or(DEFAULT_PING_COUNT as u64) as u32;
                let output = self
                    .runner
                    .run(
                        &self.platform.ping(host, count),
                        RunOptions::with_timeout(PING_TIMEOUT_MS),
                    )
                    .await
                    .map_err(|e| to_rpc_error(e.into()))?;
                to_json(&json!({
                    "exit_code": output.exit_code,
                    "stdout": output.stdout,
                    "stderr": output.stderr,
                }))
            }
            "nslookup" => {
                let domain = args["domain"].as_str().unwrap_or(DEFAULT_LOOKUP_DOMAIN);
                let output = self
                    .runner
                    .run(
                        &self.platform.nslookup(domain),
                        RunOptions::with_timeout(LOOKUP_TIMEOUT_MS).ignoring_exit_code(),
                    )
                    .await
                    .map_err(|e| to_rpc_error(e.into()))?;
                to_json(&json!({
                    "exit_code": output.exit_code,
                    "stdout": output.stdout,
                    "stderr": output.stderr,
                }))
            }
            "upgrade_node" => {
                let report = self.executor.upgrade_node().await.map_err(to_rpc_error)?;
                to_json(&report)
            }
            "open_firewall" => {
                let port = args["port"].as_u64().map(|p| p as u16);
                let report = self
                    .executor
                    .open_firewall(port)
                    .await
                    .map_err(to_rpc_error)?;
                to_json(&report)
            }
            "free_port" => {
                let port = args["port"].as_u64().ok_or_else(|| {
                    to_rpc_error(AppError::Validation("free_port requires a port".to_string()))
                })? as u16;
                let report = self.executor.free_port(port).await.map_err(to_rpc_error)?;
                to_json(&report)
            }
            "set_env" => {
                let updates: BTreeMap<String, String> =
                    serde_json::from_value(args.clone()).map_err(|e| {
                        to_rpc_error(AppError::Validation(format!(
                            "set_env expects a string map: {}",
                            e
                        )))
                    })?;
                let report = self.executor.set_env(updates).await.map_err(to_rpc_error)?;
                to_json(&report)
            }
            "diagnostics" => {
                let port = args["port"].as_u64().map(|p| p as u16);
                let report = self.diagnostics.run_all(port).await;
                to_json(&report)
            }
            other => Err(to_rpc_error(AppError::Validation(format!(
                "Unknown tool requested: {}",
                other
            )))),
        }
    }

    /// agent.rollback.v1
    pub async fn rollback(
        &self,
        params: RollbackRequest,
    ) -> Result<RollbackReport, ErrorObjectOwned> {
        self.rollback
            .rollback(&params.snapshot_id)
            .await
            .map_err(to_rpc_error)
    }

    /// agent.diagnostics.v1
    pub async fn diagnostics(
        &self,
        params: DiagnosticsRequest,
    ) -> Result<DiagnosticsReport, ErrorObjectOwned> {
        Ok(self.diagnostics.run_all(params.port).await)
    }

    /// agent.snapshots.v1
    pub async fn snapshots(
        &self,
        params: SnapshotsRequest,
    ) -> Result<SnapshotsResponse, ErrorObjectOwned> {
        let snapshots = self
            .snapshots
            .list_recent(params.limit)
            .await
            .map_err(to_rpc_error)?;
        Ok(SnapshotsResponse { snapshots })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ErrorObjectOwned> {
    serde_json::to_value(value).map_err(|e| to_rpc_error(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsmedic_core::port::audit_log::mocks::RecordingAuditLog;
    use opsmedic_core::port::env_file::mocks::InMemoryEnvFile;
    use opsmedic_core::port::platform::UnixCommands;
    use opsmedic_core::port::process_runner::mocks::MockProcessRunner;
    use opsmedic_core::port::snapshot_store::mocks::InMemorySnapshotStore;
    use opsmedic_core::port::system_probe::mocks::MockSystemProbe;
    use opsmedic_core::port::time_provider::SystemTimeProvider;

    fn handler() -> RpcHandler {
        let snapshots: Arc<dyn SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
        let runner: Arc<dyn ProcessRunner> = Arc::new(MockProcessRunner::new());
        let audit: Arc<dyn AuditLog> = Arc::new(RecordingAuditLog::new());
        let platform: Arc<dyn PlatformCommands> = Arc::new(UnixCommands);
        let env_file: Arc<dyn opsmedic_core::port::EnvFileStore> =
            Arc::new(InMemoryEnvFile::empty());
        let config = AgentConfig::default();

        let executor = Arc::new(ActionExecutor::new(
            snapshots.clone(),
            runner.clone(),
            audit.clone(),
            platform.clone(),
            env_file.clone(),
            config.clone(),
        ));
        let diagnostics = Arc::new(DiagnosticsEngine::new(
            runner.clone(),
            Arc::new(MockSystemProbe),
            platform.clone(),
            Arc::new(SystemTimeProvider),
            config.clone(),
        ));
        let rollback = Arc::new(RollbackService::with_default_handlers(
            snapshots.clone(),
            audit.clone(),
            runner.clone(),
            platform.clone(),
            env_file,
        ));

        RpcHandler::new(
            executor,
            diagnostics,
            rollback,
            snapshots,
            runner,
            platform,
            audit,
            config,
        )
    }

    #[tokio::test]
    async fn test_execute_without_permission_is_refused() {
        let h = handler();
        let err = h
            .execute(ExecuteRequest {
                tool: "open_firewall".to_string(),
                args: json!({"port": 8080}),
                permission: false,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::error::code::PERMISSION_REQUIRED);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool_is_validation_error() {
        let h = handler();
        let err = h
            .execute(ExecuteRequest {
                tool: "format_disk".to_string(),
                args: json!({}),
                permission: true,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::error::code::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn test_execute_upgrade_node_returns_plan() {
        let h = handler();
        let result = h
            .execute(ExecuteRequest {
                tool: "upgrade_node".to_string(),
                args: json!({}),
                permission: true,
            })
            .await
            .unwrap();

        assert_eq!(result["requires_manual_confirm"], true);
        assert_eq!(result["outcome"]["type"], "planned");
    }

    #[tokio::test]
    async fn test_rollback_unknown_snapshot_is_not_found() {
        let h = handler();
        let err = h
            .rollback(RollbackRequest {
                snapshot_id: "env_update-0-nope".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::error::code::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_plan_maps_intent_keywords() {
        let h = handler();
        let response = h
            .plan(PlanRequest {
                message: "please fix the firewall".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.plan.len(), 1);
        assert!(response.needs_permission);
    }
}
