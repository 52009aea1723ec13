// Agent Configuration

use serde::{Deserialize, Serialize};

/// Runtime configuration consumed by the executor, planner, and diagnostics
///
/// Built by the composition root from environment variables; defaults match
/// a local single-service deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Default service port (firewall/port-conflict target when unspecified)
    pub service_port: u16,
    /// Environment variables the env_vars check requires to be present
    pub required_env: Vec<String>,
    /// Path of the environment file mutated by set_env
    pub env_file_path: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            service_port: 5000,
            required_env: vec!["HF_TOKEN".to_string()],
            env_file_path: ".env".to_string(),
        }
    }
}
