//! JSON-RPC Server
//!
//! Implements the JSON-RPC 2.0 server over localhost TCP.

use crate::handler::RpcHandler;
use crate::types::{
    DiagnosticsRequest, ExecuteRequest, PlanRequest, RollbackRequest, SnapshotsRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

// Note: jsonrpsee doesn't support Unix sockets directly (hyper limitation)
// Using TCP on localhost as secure alternative (no external access)
const DEFAULT_SOCKET_PATH: &str = "~/.opsmedic/opsmedic.sock";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9530;

/// RPC Server Configuration
pub struct RpcServerConfig {
    pub socket_path: PathBuf, // Reserved for future UDS support
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            socket_path: shellexpand::tilde(DEFAULT_SOCKET_PATH).into_owned().into(),
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: Arc<RpcHandler>) -> Self {
        Self { config, handler }
    }

    /// Start the JSON-RPC server
    ///
    /// Security: Only binds to 127.0.0.1 (no external access)
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP (localhost only)"
        );

        // Build server with localhost-only binding
        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let mut module = RpcModule::new(());

        // Register methods
        let handler = self.handler.clone();
        module
            .register_async_method("agent.plan.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: PlanRequest = params.parse()?;
                    handler.plan(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("agent.execute.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: ExecuteRequest = params.parse()?;
                    handler.execute(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("agent.rollback.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: RollbackRequest = params.parse()?;
                    handler.rollback(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("agent.diagnostics.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: DiagnosticsRequest = params.parse().unwrap_or_default();
                    handler.diagnostics(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("agent.snapshots.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: SnapshotsRequest = params.parse()?;
                    handler.snapshots(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        info!("JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok(handle)
    }
}
