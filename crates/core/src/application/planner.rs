// Intent Planner
// Keyword match over a fixed vocabulary. Intentionally simple: the plan is
// proposed, never executed, and any non-empty plan requires permission.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::AgentConfig;

/// One proposed step, serialized as `{action, args}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "args", rename_all = "snake_case")]
pub enum PlannedStep {
    UpgradeNode {},
    OpenFirewall { port: u16 },
    SetEnv { updates: BTreeMap<String, String> },
    Diagnostics { port: u16 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedPlan {
    pub plan: Vec<PlannedStep>,
    pub needs_permission: bool,
    pub permission_prompt: Option<String>,
}

const PERMISSION_PROMPT: &str = "Do you approve running these actions?";

/// Map a free-text intent onto an ordered action sequence
pub fn propose(message: &str, config: &AgentConfig) -> ProposedPlan {
    let msg = message.to_lowercase();
    let mut plan = Vec::new();

    if msg.contains("node") || msg.contains("runtime") {
        plan.push(PlannedStep::UpgradeNode {});
    }
    if msg.contains("firewall") {
        plan.push(PlannedStep::OpenFirewall {
            port: config.service_port,
        });
    }
    if msg.contains("token") || msg.contains("credential") {
        let updates = config
            .required_env
            .iter()
            .map(|key| (key.clone(), "PASTE_VALUE".to_string()))
            .collect();
        plan.push(PlannedStep::SetEnv { updates });
    }
    if msg.contains("wifi") || msg.contains("network") || msg.contains("diagnostics") {
        plan.push(PlannedStep::Diagnostics {
            port: config.service_port,
        });
    }

    let needs_permission = !plan.is_empty();
    ProposedPlan {
        plan,
        needs_permission,
        permission_prompt: needs_permission.then(|| PERMISSION_PROMPT.to_string()),
    }
}
