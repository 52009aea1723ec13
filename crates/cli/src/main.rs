//! Opsmedic CLI - Command-line interface for the Opsmedic Host Agent

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9530";

#[derive(Parser)]
#[command(name = "opsmedic")]
#[command(about = "Opsmedic Host Agent CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "OPSMEDIC_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose an action plan for a free-text intent
    Plan {
        /// Intent message (e.g., "fix node version and open firewall")
        message: String,
    },

    /// Execute a tool (action, diagnostics, or probe)
    Execute {
        /// Tool name (upgrade_node, open_firewall, free_port, set_env,
        /// diagnostics, ping, nslookup)
        #[arg(short, long)]
        tool: String,

        /// Tool arguments as JSON
        #[arg(long, default_value = "{}")]
        args: String,

        /// Grant permission to run the tool
        #[arg(short, long)]
        yes: bool,
    },

    /// Run the full diagnostics sweep
    Diagnose {
        /// Service port to probe (default: agent configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Restore a captured snapshot
    Rollback {
        /// Snapshot ID
        snapshot_id: String,
    },

    /// List recent snapshots
    Snapshots {
        /// Number of snapshots to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Tabled)]
struct CheckRow {
    check: String,
    ok: String,
    impact: String,
    fix: String,
}

#[derive(Tabled)]
struct SnapshotRow {
    id: String,
    kind: String,
    created_at: i64,
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to agent daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn print_diagnostics(report: &serde_json::Value) {
    let summary_ok = report["summary"]["ok"].as_bool().unwrap_or(false);

    let rows: Vec<CheckRow> = report["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .map(|r| CheckRow {
                    check: r["id"].as_str().unwrap_or("?").to_string(),
                    ok: if r["ok"].as_bool().unwrap_or(false) {
                        "pass".to_string()
                    } else {
                        "FAIL".to_string()
                    },
                    impact: r["impact"].as_str().unwrap_or("").to_string(),
                    fix: r["fix"].as_str().unwrap_or("-").to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let table = Table::new(rows).to_string();
    println!("{}", table);
    println!();

    if summary_ok {
        println!("{}", "✓ All checks passed".green().bold());
    } else {
        let issues = report["summary"]["issues"]
            .as_array()
            .map(|i| i.len())
            .unwrap_or(0);
        println!("{}", format!("✗ {} issue(s) found", issues).red().bold());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan { message } => {
            let params = json!({ "message": message });
            let result = call_rpc(&cli.rpc_url, "agent.plan.v1", params).await?;

            let steps = result["plan"].as_array().cloned().unwrap_or_default();
            if steps.is_empty() {
                println!("{}", "No actions matched this intent".yellow());
            } else {
                println!("{}", "Proposed plan:".bold());
                for (i, step) in steps.iter().enumerate() {
                    println!(
                        "  {}. {} {}",
                        i + 1,
                        step["action"].as_str().unwrap_or("?").cyan(),
                        step["args"].to_string().dimmed()
                    );
                }
                if let Some(prompt) = result["permission_prompt"].as_str() {
                    println!();
                    println!("{}", prompt.yellow());
                    println!("Run with: opsmedic execute --tool <action> --yes");
                }
            }
        }

        Commands::Execute { tool, args, yes } => {
            let args_json: serde_json::Value =
                serde_json::from_str(&args).context("Invalid JSON args")?;

            let params = json!({
                "tool": tool,
                "args": args_json,
                "permission": yes,
            });

            let result = call_rpc(&cli.rpc_url, "agent.execute.v1", params).await?;

            if tool == "diagnostics" {
                print_diagnostics(&result);
            } else {
                println!("{}", format!("✓ {} completed", tool).green().bold());
                println!();
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }

        Commands::Diagnose { port } => {
            let params = match port {
                Some(port) => json!({ "port": port }),
                None => json!({}),
            };
            let result = call_rpc(&cli.rpc_url, "agent.diagnostics.v1", params).await?;
            print_diagnostics(&result);
        }

        Commands::Rollback { snapshot_id } => {
            let params = json!({ "snapshot_id": snapshot_id });
            let result = call_rpc(&cli.rpc_url, "agent.rollback.v1", params).await?;

            let restored = result["restored"].as_bool().unwrap_or(false);
            if restored {
                println!("{}", format!("✓ Snapshot {} restored", snapshot_id).green().bold());
            } else {
                println!("{}", format!("Snapshot {} not restored", snapshot_id).yellow().bold());
            }
            if let Some(detail) = result["detail"].as_str() {
                println!("  {}", detail);
            }
        }

        Commands::Snapshots { limit } => {
            let params = json!({ "limit": limit });
            let result = call_rpc(&cli.rpc_url, "agent.snapshots.v1", params).await?;

            let rows: Vec<SnapshotRow> = result["snapshots"]
                .as_array()
                .map(|snapshots| {
                    snapshots
                        .iter()
                        .map(|s| SnapshotRow {
                            id: s["id"].as_str().unwrap_or("?").to_string(),
                            kind: s["kind"].as_str().unwrap_or("?").to_string(),
                            created_at: s["created_at"].as_i64().unwrap_or(0),
                        })
                        .collect()
                })
                .unwrap_or_default();

            if rows.is_empty() {
                println!("{}", "No snapshots recorded".yellow());
            } else {
                let table = Table::new(rows).to_string();
                println!("{}", table);
            }
        }
    }

    Ok(())
}
