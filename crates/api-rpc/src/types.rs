//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use opsmedic_core::application::PlannedStep;
use opsmedic_core::domain::Snapshot;
use serde::{Deserialize, Serialize};

/// agent.plan.v1 - Propose an action plan for a free-text intent
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub plan: Vec<PlannedStep>,
    pub needs_permission: bool,
    pub permission_prompt: Option<String>,
}

/// agent.execute.v1 - Run a tool (action, diagnostics, or probe)
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub tool: String,
    #[serde(default = "empty_args")]
    pub args: serde_json::Value,
    #[serde(default)]
    pub permission: bool,
}

fn empty_args() -> serde_json::Value {
    serde_json::json!({})
}

/// agent.rollback.v1 - Restore a captured snapshot
#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    pub snapshot_id: String,
}

/// agent.diagnostics.v1 - Run the full check catalog
#[derive(Debug, Deserialize, Default)]
pub struct DiagnosticsRequest {
    #[serde(default)]
    pub port: Option<u16>,
}

/// agent.snapshots.v1 - List recent snapshots
#[derive(Debug, Deserialize)]
pub struct SnapshotsRequest {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotsResponse {
    pub snapshots: Vec<Snapshot>,
}
