// Snapshot Domain Model

use serde::{Deserialize, Serialize};

/// Snapshot ID: `<kind>-<epoch_ms>-<random suffix>`
pub type SnapshotId = String;

/// Which action category created a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    NodeUpgrade,
    PortFree,
    FirewallOpen,
    EnvUpdate,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::NodeUpgrade => "node_upgrade",
            SnapshotKind::PortFree => "port_free",
            SnapshotKind::FirewallOpen => "firewall_open",
            SnapshotKind::EnvUpdate => "env_update",
        }
    }
}

impl std::fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SnapshotKind {
    type Err = crate::domain::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node_upgrade" => Ok(SnapshotKind::NodeUpgrade),
            "port_free" => Ok(SnapshotKind::PortFree),
            "firewall_open" => Ok(SnapshotKind::FirewallOpen),
            "env_update" => Ok(SnapshotKind::EnvUpdate),
            other => Err(crate::domain::DomainError::UnknownSnapshotKind(
                other.to_string(),
            )),
        }
    }
}

/// Free-form pre-action context (JSON serializable)
///
/// Holds whatever the creating action needs to describe - and, for
/// restorable kinds, reverse - the mutation: affected file contents,
/// target port, changed keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta(serde_json::Value);

impl SnapshotMeta {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Snapshot Entity
///
/// Created exactly once per mutating action invocation, immediately before
/// the action's side-effecting command runs. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub kind: SnapshotKind,
    pub meta: SnapshotMeta,
    pub created_at: i64, // epoch ms
}
