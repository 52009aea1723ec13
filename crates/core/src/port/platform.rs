// Platform Command Strategy
// One injected command-builder per host OS family instead of per-action
// conditionals. Pure string construction; execution stays in the runner.

use crate::domain::ActionPlan;
use std::sync::Arc;

/// Command builders for one host OS family
pub trait PlatformCommands: Send + Sync {
    fn os_family(&self) -> &'static str;

    /// Print the installed Node version
    fn runtime_version(&self) -> String;

    /// List listeners bound to `port` (empty output = no conflict)
    fn list_port_listeners(&self, port: u16) -> String;

    /// Terminate whatever is bound to `port`
    fn free_port(&self, port: u16) -> String;

    /// Allow inbound TCP on `port` through the host firewall
    fn open_firewall(&self, port: u16) -> String;

    /// Remove the rule created by `open_firewall`
    fn close_firewall(&self, port: u16) -> String;

    /// Loopback HTTP probe printing the status code, `000` on refusal
    fn loopback_probe(&self, port: u16) -> String;

    fn ping(&self, host: &str, count: u32) -> String;

    fn nslookup(&self, domain: &str) -> String;

    /// Manual-confirmation plan for the Node 20 upgrade
    fn upgrade_node_plan(&self) -> ActionPlan;
}

/// Unix family (Linux/macOS): lsof, ufw, nvm
pub struct UnixCommands;

impl PlatformCommands for UnixCommands {
    fn os_family(&self) -> &'static str {
        "unix"
    }

    fn runtime_version(&self) -> String {
        "node -v".to_string()
    }

    fn list_port_listeners(&self, port: u16) -> String {
        format!("lsof -i :{} -P -n || true", port)
    }

    fn free_port(&self, port: u16) -> String {
        format!("lsof -ti :{} | xargs -r kill -9", port)
    }

    fn open_firewall(&self, port: u16) -> String {
        format!("sudo ufw allow {}/tcp", port)
    }

    fn close_firewall(&self, port: u16) -> String {
        format!("sudo ufw delete allow {}/tcp", port)
    }

    fn loopback_probe(&self, port: u16) -> String {
        format!(
            "curl -s -o /dev/null -w \"%{{http_code}}\" http://127.0.0.1:{} || echo 000",
            port
        )
    }

    fn ping(&self, host: &str, count: u32) -> String {
        format!("ping -c {} {}", count, host)
    }

    fn nslookup(&self, domain: &str) -> String {
        format!("nslookup {}", domain)
    }

    fn upgrade_node_plan(&self) -> ActionPlan {
        ActionPlan {
            steps: vec![
                "Install Node 20 via nvm or official installer".to_string(),
                "Set default to Node 20".to_string(),
                "Verify node -v".to_string(),
            ],
            commands: vec![
                "bash -lc \"source ~/.nvm/nvm.sh && nvm install 20 && nvm alias default 20\""
                    .to_string(),
                "node -v".to_string(),
            ],
        }
    }
}

/// Windows family: netstat/taskkill, NetFirewallRule, winget
pub struct WindowsCommands;

impl PlatformCommands for WindowsCommands {
    fn os_family(&self) -> &'static str {
        "windows"
    }

    fn runtime_version(&self) -> String {
        "node -v".to_string()
    }

    fn list_port_listeners(&self, port: u16) -> String {
        format!("netstat -ano | findstr :{}", port)
    }

    fn free_port(&self, port: u16) -> String {
        format!(
            "for /f \"tokens=5\" %a in ('netstat -ano ^| findstr :{}') do taskkill /PID %a /F",
            port
        )
    }

    fn open_firewall(&self, port: u16) -> String {
        format!(
            "powershell -Command \"New-NetFirewallRule -DisplayName 'AgentPort{port}' \
             -Direction Inbound -Action Allow -Protocol TCP -LocalPort {port}\"",
            port = port
        )
    }

    fn close_firewall(&self, port: u16) -> String {
        format!(
            "powershell -Command \"Remove-NetFirewallRule -DisplayName 'AgentPort{}'\"",
            port
        )
    }

    fn loopback_probe(&self, port: u16) -> String {
        format!(
            "curl -s -o /dev/null -w \"%{{http_code}}\" http://127.0.0.1:{} || echo 000",
            port
        )
    }

    fn ping(&self, host: &str, count: u32) -> String {
        format!("ping -n {} {}", count, host)
    }

    fn nslookup(&self, domain: &str) -> String {
        format!("nslookup {}", domain)
    }

    fn upgrade_node_plan(&self) -> ActionPlan {
        ActionPlan {
            steps: vec![
                "Install Node 20 via winget".to_string(),
                "Refresh the shell environment".to_string(),
                "Verify node -v".to_string(),
            ],
            commands: vec![
                "winget install OpenJS.NodeJS.LTS".to_string(),
                "refreshenv".to_string(),
                "node -v".to_string(),
            ],
        }
    }
}

/// Strategy for the OS family this binary was compiled for
pub fn native_commands() -> Arc<dyn PlatformCommands> {
    if cfg!(windows) {
        Arc::new(WindowsCommands)
    } else {
        Arc::new(UnixCommands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_port_commands_target_port() {
        let platform = UnixCommands;
        assert!(platform.free_port(3000).contains(":3000"));
        assert!(platform.list_port_listeners(3000).contains(":3000"));
        assert!(platform.open_firewall(8080).contains("8080/tcp"));
        assert!(platform.close_firewall(8080).contains("delete allow 8080/tcp"));
    }

    #[test]
    fn test_windows_firewall_rule_names_match() {
        let platform = WindowsCommands;
        let open = platform.open_firewall(8080);
        let close = platform.close_firewall(8080);
        assert!(open.contains("AgentPort8080"));
        assert!(close.contains("AgentPort8080"));
    }

    #[test]
    fn test_ping_flag_differs_by_family() {
        assert!(UnixCommands.ping("8.8.8.8", 4).starts_with("ping -c 4"));
        assert!(WindowsCommands.ping("8.8.8.8", 4).starts_with("ping -n 4"));
    }

    #[test]
    fn test_upgrade_plan_never_empty() {
        for platform in [&UnixCommands as &dyn PlatformCommands, &WindowsCommands] {
            let plan = platform.upgrade_node_plan();
            assert!(!plan.steps.is_empty());
            assert!(!plan.commands.is_empty());
        }
    }
}
