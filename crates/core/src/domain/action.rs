// Action Domain Model

use crate::domain::{SnapshotId, SnapshotKind};
use serde::{Deserialize, Serialize};

/// Catalog of named host-mutating operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    UpgradeNode,
    OpenFirewall,
    FreePort,
    SetEnv,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::UpgradeNode => "upgrade_node",
            ActionKind::OpenFirewall => "open_firewall",
            ActionKind::FreePort => "free_port",
            ActionKind::SetEnv => "set_env",
        }
    }

    /// The snapshot category this action captures before mutating
    pub fn snapshot_kind(&self) -> SnapshotKind {
        match self {
            ActionKind::UpgradeNode => SnapshotKind::NodeUpgrade,
            ActionKind::OpenFirewall => SnapshotKind::FirewallOpen,
            ActionKind::FreePort => SnapshotKind::PortFree,
            ActionKind::SetEnv => SnapshotKind::EnvUpdate,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = crate::domain::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upgrade_node" => Ok(ActionKind::UpgradeNode),
            "open_firewall" => Ok(ActionKind::OpenFirewall),
            "free_port" => Ok(ActionKind::FreePort),
            "set_env" => Ok(ActionKind::SetEnv),
            other => Err(crate::domain::DomainError::UnknownActionKind(
                other.to_string(),
            )),
        }
    }
}

/// Manual-confirmation plan for actions too destructive to auto-execute
///
/// Ordered human-readable steps plus the commands that would implement them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub steps: Vec<String>,
    pub commands: Vec<String>,
}

/// What an action produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Command ran; captured process output
    Executed { output: String },
    /// Environment file merged; keys actually added vs. skipped (first-writer-wins)
    EnvUpdated {
        added: Vec<String>,
        skipped: Vec<String>,
    },
    /// Nothing executed; a plan awaiting manual confirmation
    Planned { plan: ActionPlan },
}

/// Structured result of a single executor invocation
///
/// `snapshot_id` is a back-reference, not ownership: the snapshot outlives
/// this report and remains valid even when the mutation itself failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub snapshot_id: SnapshotId,
    pub outcome: ActionOutcome,
    pub requires_manual_confirm: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_action_kind_roundtrip() {
        for kind in [
            ActionKind::UpgradeNode,
            ActionKind::OpenFirewall,
            ActionKind::FreePort,
            ActionKind::SetEnv,
        ] {
            assert_eq!(ActionKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn test_snapshot_kind_mapping() {
        assert_eq!(
            ActionKind::OpenFirewall.snapshot_kind(),
            crate::domain::SnapshotKind::FirewallOpen
        );
        assert_eq!(
            ActionKind::SetEnv.snapshot_kind(),
            crate::domain::SnapshotKind::EnvUpdate
        );
    }

    #[test]
    fn test_outcome_serialization_tags() {
        let outcome = ActionOutcome::Planned {
            plan: ActionPlan {
                steps: vec!["Verify node -v".to_string()],
                commands: vec!["node -v".to_string()],
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["type"], "planned");
    }
}
