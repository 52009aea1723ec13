//! Daemon configuration from OPSMEDIC_* environment variables

use opsmedic_core::application::AgentConfig;

const DEFAULT_DB_PATH: &str = "~/.opsmedic/agent.db";
const DEFAULT_AUDIT_LOG_PATH: &str = "~/.opsmedic/audit.log";
const DEFAULT_ENV_FILE: &str = ".env";
const DEFAULT_RPC_PORT: u16 = 9530;
const DEFAULT_SERVICE_PORT: u16 = 5000;
const DEFAULT_REQUIRED_ENV: &str = "HF_TOKEN";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub audit_log_path: String,
    pub rpc_port: u16,
    pub agent: AgentConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let db_path = std::env::var("OPSMEDIC_DB_PATH")
            .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_DB_PATH).into_owned());

        let audit_log_path = std::env::var("OPSMEDIC_AUDIT_LOG")
            .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_AUDIT_LOG_PATH).into_owned());

        let rpc_port: u16 = std::env::var("OPSMEDIC_RPC_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RPC_PORT);

        let service_port: u16 = std::env::var("OPSMEDIC_SERVICE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SERVICE_PORT);

        let required_env: Vec<String> = std::env::var("OPSMEDIC_REQUIRED_ENV")
            .unwrap_or_else(|_| DEFAULT_REQUIRED_ENV.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let env_file_path =
            std::env::var("OPSMEDIC_ENV_FILE").unwrap_or_else(|_| DEFAULT_ENV_FILE.to_string());

        Self {
            db_path,
            audit_log_path,
            rpc_port,
            agent: AgentConfig {
                service_port,
                required_env,
                env_file_path,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_without_env() {
        // scoped to variables this test does not set
        let config = DaemonConfig::from_env();
        assert!(config.rpc_port > 0);
        assert!(config.agent.service_port > 0);
        assert!(!config.agent.required_env.is_empty());
    }
}
