//! Diagnostics fan-out against real child processes
//!
//! Uses a platform whose "commands" are plain shell builtins, so the real
//! runner exercises the whole spawn/drain/join path deterministically.

#![cfg(unix)]

use std::sync::Arc;

use opsmedic_core::application::{AgentConfig, DiagnosticsEngine};
use opsmedic_core::domain::{ActionPlan, CheckId};
use opsmedic_core::port::platform::PlatformCommands;
use opsmedic_core::port::system_probe::mocks::MockSystemProbe;
use opsmedic_core::port::time_provider::SystemTimeProvider;
use opsmedic_infra_system::ShellRunner;

/// Shell-builtin command set simulating a healthy host
struct HealthyHost;

impl PlatformCommands for HealthyHost {
    fn os_family(&self) -> &'static str {
        "unix"
    }
    fn runtime_version(&self) -> String {
        "echo v20.11.1".to_string()
    }
    fn list_port_listeners(&self, _port: u16) -> String {
        "true".to_string() // no output: no conflict
    }
    fn free_port(&self, _port: u16) -> String {
        "true".to_string()
    }
    fn open_firewall(&self, _port: u16) -> String {
        "true".to_string()
    }
    fn close_firewall(&self, _port: u16) -> String {
        "true".to_string()
    }
    fn loopback_probe(&self, _port: u16) -> String {
        "echo 000".to_string()
    }
    fn ping(&self, _host: &str, _count: u32) -> String {
        "true".to_string()
    }
    fn nslookup(&self, _domain: &str) -> String {
        "true".to_string()
    }
    fn upgrade_node_plan(&self) -> ActionPlan {
        ActionPlan {
            steps: vec![],
            commands: vec![],
        }
    }
}

/// Same host, but the version command crashes
struct BrokenVersionHost;

impl PlatformCommands for BrokenVersionHost {
    fn os_family(&self) -> &'static str {
        "unix"
    }
    fn runtime_version(&self) -> String {
        "exit 127".to_string()
    }
    fn list_port_listeners(&self, port: u16) -> String {
        HealthyHost.list_port_listeners(port)
    }
    fn free_port(&self, port: u16) -> String {
        HealthyHost.free_port(port)
    }
    fn open_firewall(&self, port: u16) -> String {
        HealthyHost.open_firewall(port)
    }
    fn close_firewall(&self, port: u16) -> String {
        HealthyHost.close_firewall(port)
    }
    fn loopback_probe(&self, port: u16) -> String {
        HealthyHost.loopback_probe(port)
    }
    fn ping(&self, host: &str, count: u32) -> String {
        HealthyHost.ping(host, count)
    }
    fn nslookup(&self, domain: &str) -> String {
        HealthyHost.nslookup(domain)
    }
    fn upgrade_node_plan(&self) -> ActionPlan {
        HealthyHost.upgrade_node_plan()
    }
}

fn engine(platform: Arc<dyn PlatformCommands>, required_env: Vec<String>) -> DiagnosticsEngine {
    DiagnosticsEngine::new(
        Arc::new(ShellRunner::new()),
        Arc::new(MockSystemProbe),
        platform,
        Arc::new(SystemTimeProvider),
        AgentConfig {
            required_env,
            ..AgentConfig::default()
        },
    )
}

#[tokio::test]
async fn test_healthy_host_reports_ok_with_no_issues() {
    std::env::set_var("OPSMEDIC_IT_TOKEN", "present");
    let engine = engine(Arc::new(HealthyHost), vec!["OPSMEDIC_IT_TOKEN".to_string()]);

    let report = engine.run_all(Some(5000)).await;

    assert!(report.summary.ok, "issues: {:?}", report.summary.issues);
    assert!(report.summary.issues.is_empty());
    assert_eq!(report.results.len(), 7);
    assert!(report.summary.timestamp > 0);
}

#[tokio::test]
async fn test_crashing_check_is_isolated_from_the_batch() {
    std::env::set_var("OPSMEDIC_IT_TOKEN", "present");
    let engine = engine(
        Arc::new(BrokenVersionHost),
        vec!["OPSMEDIC_IT_TOKEN".to_string()],
    );

    let report = engine.run_all(Some(5000)).await;

    assert!(!report.summary.ok);
    assert_eq!(report.results.len(), 7);

    // the broken check reports its fault
    let version = &report.results[0];
    assert_eq!(version.id, CheckId::NodeVersion);
    assert!(!version.ok);
    assert!(version.error.is_some());

    // every sibling check still settled cleanly
    assert!(report.results[1..].iter().all(|r| r.ok));

    // issue order matches invocation order
    assert_eq!(report.summary.issues.len(), 1);
    assert_eq!(report.summary.issues[0].id, CheckId::NodeVersion);
}

#[tokio::test]
async fn test_missing_required_env_is_the_only_issue() {
    std::env::remove_var("OPSMEDIC_IT_TOKEN_ABSENT");
    let engine = engine(
        Arc::new(HealthyHost),
        vec!["OPSMEDIC_IT_TOKEN_ABSENT".to_string()],
    );

    let report = engine.run_all(None).await;

    assert!(!report.summary.ok);
    assert_eq!(report.summary.issues.len(), 1);
    assert_eq!(report.summary.issues[0].id, CheckId::EnvVars);
}
