// Diagnostics Domain Model

use crate::domain::ActionKind;
use serde::{Deserialize, Serialize};

/// Stable identifiers for the fixed check catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckId {
    NodeVersion,
    PortConflict,
    FirewallBasic,
    EnvVars,
    CpuStats,
    MemoryStats,
    NetworkStats,
}

impl CheckId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckId::NodeVersion => "node_version",
            CheckId::PortConflict => "port_conflict",
            CheckId::FirewallBasic => "firewall_basic",
            CheckId::EnvVars => "env_vars",
            CheckId::CpuStats => "cpu_stats",
            CheckId::MemoryStats => "memory_stats",
            CheckId::NetworkStats => "network_stats",
        }
    }
}

impl std::fmt::Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform result record produced by every check
///
/// `details` carries the check-specific fields (current/required version,
/// port, missing keys, measured metrics) and is flattened into the JSON
/// representation so each result reads as one flat object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: CheckId,
    pub ok: bool,
    #[serde(flatten)]
    pub details: serde_json::Value,
    /// Human-readable consequence of failure, or "none"
    pub impact: String,
    /// Executor operation that would remediate this failure
    pub fix: Option<ActionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    /// A passing result with informational details
    pub fn passing(id: CheckId, details: serde_json::Value) -> Self {
        Self {
            id,
            ok: true,
            details,
            impact: "none".to_string(),
            fix: None,
            error: None,
        }
    }

    /// A failing result with an impact statement and optional fix hint
    pub fn failing(
        id: CheckId,
        details: serde_json::Value,
        impact: impl Into<String>,
        fix: Option<ActionKind>,
    ) -> Self {
        Self {
            id,
            ok: false,
            details,
            impact: impact.into(),
            fix,
            error: None,
        }
    }

    /// A check that faulted internally (isolation: recorded, never propagated)
    pub fn faulted(id: CheckId, error: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            details: serde_json::json!({}),
            impact: "Check failed".to_string(),
            fix: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregate over one diagnostics run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    /// true iff every contained check passed
    pub ok: bool,
    /// Failing checks in check-invocation order (not re-sorted by severity)
    pub issues: Vec<CheckResult>,
    pub timestamp: i64, // epoch ms
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub summary: DiagnosticsSummary,
    pub results: Vec<CheckResult>,
}
