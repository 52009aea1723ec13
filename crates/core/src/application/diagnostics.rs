// Diagnostics Engine
// Fixed catalog of read-only checks, fanned out as independent tasks and
// joined before aggregation. A fault inside one check becomes a failed
// result for that check alone; the batch never short-circuits.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::application::AgentConfig;
use crate::domain::{ActionKind, CheckId, CheckResult, DiagnosticsReport, DiagnosticsSummary};
use crate::error::Result;
use crate::port::{PlatformCommands, ProcessRunner, RunOptions, SystemProbe, TimeProvider};

/// Minimum supported Node major version
const MIN_NODE_MAJOR: u32 = 20;

const VERSION_CHECK_TIMEOUT_MS: u64 = 8_000;
const PORT_CHECK_TIMEOUT_MS: u64 = 8_000;
const PROBE_CHECK_TIMEOUT_MS: u64 = 5_000;

pub struct DiagnosticsEngine {
    runner: Arc<dyn ProcessRunner>,
    probe: Arc<dyn SystemProbe>,
    platform: Arc<dyn PlatformCommands>,
    time_provider: Arc<dyn TimeProvider>,
    config: AgentConfig,
}

impl DiagnosticsEngine {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        probe: Arc<dyn SystemProbe>,
        platform: Arc<dyn PlatformCommands>,
        time_provider: Arc<dyn TimeProvider>,
        config: AgentConfig,
    ) -> Self {
        Self {
            runner,
            probe,
            platform,
            time_provider,
            config,
        }
    }

    /// Run every check concurrently and aggregate
    ///
    /// Completes only once every check has settled. `issues` preserves
    /// check-invocation order.
    pub async fn run_all(&self, port: Option<u16>) -> DiagnosticsReport {
        let port = port.unwrap_or(self.config.service_port);

        debug!(port = %port, "Starting diagnostics fan-out");

        // Spawned tasks isolate panics as well as errors: a panicking check
        // surfaces as a JoinError, not an unwind through the join.
        let handles: Vec<(CheckId, JoinHandle<Result<CheckResult>>)> = vec![
            (
                CheckId::NodeVersion,
                tokio::spawn(check_node_version(
                    self.runner.clone(),
                    self.platform.clone(),
                )),
            ),
            (
                CheckId::PortConflict,
                tokio::spawn(check_port_conflict(
                    self.runner.clone(),
                    self.platform.clone(),
                    port,
                )),
            ),
            (
                CheckId::FirewallBasic,
                tokio::spawn(check_firewall(
                    self.runner.clone(),
                    self.platform.clone(),
                    port,
                )),
            ),
            (
                CheckId::EnvVars,
                tokio::spawn(check_env_vars(self.config.required_env.clone())),
            ),
            (CheckId::CpuStats, tokio::spawn(check_cpu(self.probe.clone()))),
            (
                CheckId::MemoryStats,
                tokio::spawn(check_memory(self.probe.clone())),
            ),
            (
                CheckId::NetworkStats,
                tokio::spawn(check_network(self.probe.clone())),
            ),
        ];

        let (ids, joins): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let settled = join_all(joins).await;

        let results: Vec<CheckResult> = ids
            .into_iter()
            .zip(settled)
            .map(|(id, outcome)| match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(err)) => CheckResult::faulted(id, err.to_string()),
                Err(join_err) => CheckResult::faulted(id, format!("check panicked: {}", join_err)),
            })
            .collect();

        let issues: Vec<CheckResult> = results.iter().filter(|r| !r.ok).cloned().collect();

        DiagnosticsReport {
            summary: DiagnosticsSummary {
                ok: issues.is_empty(),
                issues,
                timestamp: self.time_provider.now_millis(),
            },
            results,
        }
    }
}

async fn check_node_version(
    runner: Arc<dyn ProcessRunner>,
    platform: Arc<dyn PlatformCommands>,
) -> Result<CheckResult> {
    let output = runner
        .run(
            &platform.runtime_version(),
            RunOptions::with_timeout(VERSION_CHECK_TIMEOUT_MS),
        )
        .await?;

    let version = output.stdout.trim().trim_start_matches('v').to_string();
    let major: Option<u32> = version.split('.').next().and_then(|s| s.parse().ok());
    let ok = major.is_some_and(|m| m >= MIN_NODE_MAJOR);

    let details = json!({
        "current": version,
        "required": format!(">={}", MIN_NODE_MAJOR),
    });

    Ok(if ok {
        CheckResult::passing(CheckId::NodeVersion, details)
    } else {
        CheckResult::failing(
            CheckId::NodeVersion,
            details,
            "Tooling requiring Node 20+ may fail",
            Some(ActionKind::UpgradeNode),
        )
    })
}

async fn check_port_conflict(
    runner: Arc<dyn ProcessRunner>,
    platform: Arc<dyn PlatformCommands>,
    port: u16,
) -> Result<CheckResult> {
    let output = runner
        .run(
            &platform.list_port_listeners(port),
            RunOptions::with_timeout(PORT_CHECK_TIMEOUT_MS).ignoring_exit_code(),
        )
        .await?;

    let conflict = !output.stdout.trim().is_empty();
    let details = json!({ "port": port });

    Ok(if conflict {
        CheckResult::failing(
            CheckId::PortConflict,
            details,
            format!("Port {} in use", port),
            Some(ActionKind::FreePort),
        )
    } else {
        CheckResult::passing(CheckId::PortConflict, details)
    })
}

async fn check_firewall(
    runner: Arc<dyn ProcessRunner>,
    platform: Arc<dyn PlatformCommands>,
    port: u16,
) -> Result<CheckResult> {
    let output = runner
        .run(
            &platform.loopback_probe(port),
            RunOptions::with_timeout(PROBE_CHECK_TIMEOUT_MS).ignoring_exit_code(),
        )
        .await?;

    // A refused-but-reachable loopback ("000") means the firewall is not
    // blocking local traffic, same as a served "200".
    let status = output.stdout.trim().to_string();
    let ok = status == "200" || status == "000";
    let details = json!({ "status_code": status });

    Ok(if ok {
        CheckResult::passing(CheckId::FirewallBasic, details)
    } else {
        CheckResult::failing(
            CheckId::FirewallBasic,
            details,
            "Local requests blocked",
            Some(ActionKind::OpenFirewall),
        )
    })
}

async fn check_env_vars(required: Vec<String>) -> Result<CheckResult> {
    let missing: Vec<String> = required
        .iter()
        .filter(|key| std::env::var(key).map(|v| v.is_empty()).unwrap_or(true))
        .cloned()
        .collect();

    let details = json!({ "required": required, "missing": missing });

    Ok(if missing.is_empty() {
        CheckResult::passing(CheckId::EnvVars, details)
    } else {
        CheckResult::failing(
            CheckId::EnvVars,
            details,
            "Model integration will fail without required tokens/config",
            Some(ActionKind::SetEnv),
        )
    })
}

async fn check_cpu(probe: Arc<dyn SystemProbe>) -> Result<CheckResult> {
    let stats = probe.cpu().await;
    Ok(CheckResult::passing(
        CheckId::CpuStats,
        serde_json::to_value(stats)?,
    ))
}

async fn check_memory(probe: Arc<dyn SystemProbe>) -> Result<CheckResult> {
    let stats = probe.memory().await;
    Ok(CheckResult::passing(
        CheckId::MemoryStats,
        serde_json::to_value(stats)?,
    ))
}

async fn check_network(probe: Arc<dyn SystemProbe>) -> Result<CheckResult> {
    let interfaces = probe.network_interfaces().await;
    Ok(CheckResult::passing(
        CheckId::NetworkStats,
        json!({ "interfaces": interfaces }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::platform::UnixCommands;
    use crate::port::process_runner::mocks::{MockProcessRunner, PanickingRunner};
    use crate::port::process_runner::RunError;
    use crate::port::system_probe::mocks::MockSystemProbe;
    use crate::port::time_provider::mocks::FixedTimeProvider;

    const FIXED_NOW_MS: i64 = 1_700_000_000_000;

    fn engine_with(runner: Arc<dyn ProcessRunner>, config: AgentConfig) -> DiagnosticsEngine {
        DiagnosticsEngine::new(
            runner,
            Arc::new(MockSystemProbe),
            Arc::new(UnixCommands),
            Arc::new(FixedTimeProvider(FIXED_NOW_MS)),
            config,
        )
    }

    fn green_runner() -> MockProcessRunner {
        MockProcessRunner::new()
            .on_stdout("node -v", "v20.11.1\n")
            .on_stdout("lsof -i", "")
            .on_stdout("curl", "000")
    }

    #[tokio::test]
    async fn test_all_green_host_yields_ok_summary() {
        std::env::set_var("OPSMEDIC_TEST_TOKEN", "present");
        let config = AgentConfig {
            required_env: vec!["OPSMEDIC_TEST_TOKEN".to_string()],
            ..AgentConfig::default()
        };
        let engine = engine_with(Arc::new(green_runner()), config);

        let report = engine.run_all(Some(5000)).await;

        assert!(report.summary.ok);
        assert!(report.summary.issues.is_empty());
        assert_eq!(report.results.len(), 7);
        assert_eq!(report.summary.timestamp, FIXED_NOW_MS);
    }

    #[tokio::test]
    async fn test_results_preserve_catalog_order() {
        std::env::set_var("OPSMEDIC_TEST_TOKEN", "present");
        let config = AgentConfig {
            required_env: vec!["OPSMEDIC_TEST_TOKEN".to_string()],
            ..AgentConfig::default()
        };
        let engine = engine_with(Arc::new(green_runner()), config);

        let report = engine.run_all(None).await;

        let ids: Vec<CheckId> = report.results.iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                CheckId::NodeVersion,
                CheckId::PortConflict,
                CheckId::FirewallBasic,
                CheckId::EnvVars,
                CheckId::CpuStats,
                CheckId::MemoryStats,
                CheckId::NetworkStats,
            ]
        );
    }

    #[tokio::test]
    async fn test_old_runtime_flagged_with_fix() {
        std::env::set_var("OPSMEDIC_TEST_TOKEN", "present");
        let runner = MockProcessRunner::new()
            .on_stdout("node -v", "v18.19.0\n")
            .on_stdout("curl", "200");
        let config = AgentConfig {
            required_env: vec!["OPSMEDIC_TEST_TOKEN".to_string()],
            ..AgentConfig::default()
        };
        let engine = engine_with(Arc::new(runner), config);

        let report = engine.run_all(None).await;

        assert!(!report.summary.ok);
        assert_eq!(report.summary.issues[0].id, CheckId::NodeVersion);
        assert_eq!(report.summary.issues[0].fix, Some(ActionKind::UpgradeNode));
    }

    #[tokio::test]
    async fn test_port_conflict_detected() {
        std::env::set_var("OPSMEDIC_TEST_TOKEN", "present");
        let runner = MockProcessRunner::new()
            .on_stdout("node -v", "v20.11.1\n")
            .on_stdout("lsof -i", "node    1234 user   23u  IPv4 TCP *:5000 (LISTEN)\n")
            .on_stdout("curl", "000");
        let config = AgentConfig {
            required_env: vec!["OPSMEDIC_TEST_TOKEN".to_string()],
            ..AgentConfig::default()
        };
        let engine = engine_with(Arc::new(runner), config);

        let report = engine.run_all(Some(5000)).await;

        let conflict = report
            .results
            .iter()
            .find(|r| r.id == CheckId::PortConflict)
            .unwrap();
        assert!(!conflict.ok);
        assert_eq!(conflict.fix, Some(ActionKind::FreePort));
    }

    #[tokio::test]
    async fn test_one_faulted_check_never_suppresses_the_rest() {
        std::env::set_var("OPSMEDIC_TEST_TOKEN", "present");
        let runner = MockProcessRunner::new()
            .on("node -v", Err(RunError::SpawnFailed("no shell".to_string())))
            .on_stdout("lsof -i", "")
            .on_stdout("curl", "000");
        let config = AgentConfig {
            required_env: vec!["OPSMEDIC_TEST_TOKEN".to_string()],
            ..AgentConfig::default()
        };
        let engine = engine_with(Arc::new(runner), config);

        let report = engine.run_all(None).await;

        assert_eq!(report.results.len(), 7);
        assert!(!report.summary.ok);

        let faulted = &report.results[0];
        assert_eq!(faulted.id, CheckId::NodeVersion);
        assert!(faulted.error.is_some());

        // every other check settled normally
        assert!(report.results[1..].iter().all(|r| r.error.is_none()));
    }

    #[tokio::test]
    async fn test_panicking_check_is_isolated() {
        std::env::set_var("OPSMEDIC_TEST_TOKEN", "present");
        let config = AgentConfig {
            required_env: vec!["OPSMEDIC_TEST_TOKEN".to_string()],
            ..AgentConfig::default()
        };
        let engine = engine_with(Arc::new(PanickingRunner), config);

        let report = engine.run_all(None).await;

        // runner-backed checks faulted; probe-backed checks still pass
        assert_eq!(report.results.len(), 7);
        assert!(!report.summary.ok);
        assert!(report
            .results
            .iter()
            .find(|r| r.id == CheckId::MemoryStats)
            .unwrap()
            .ok);
    }

    #[tokio::test]
    async fn test_missing_env_var_flagged() {
        std::env::remove_var("OPSMEDIC_TEST_TOKEN_MISSING");
        let config = AgentConfig {
            required_env: vec!["OPSMEDIC_TEST_TOKEN_MISSING".to_string()],
            ..AgentConfig::default()
        };
        let engine = engine_with(Arc::new(green_runner()), config);

        let report = engine.run_all(None).await;

        let env_check = report
            .results
            .iter()
            .find(|r| r.id == CheckId::EnvVars)
            .unwrap();
        assert!(!env_check.ok);
        assert_eq!(env_check.fix, Some(ActionKind::SetEnv));
        assert_eq!(
            env_check.details["missing"],
            serde_json::json!(["OPSMEDIC_TEST_TOKEN_MISSING"])
        );
    }
}
