//! Opsmedic Host Agent - Main Entry Point

mod config;
mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use opsmedic_api_rpc::handler::RpcHandler;
use opsmedic_api_rpc::server::RpcServerConfig;
use opsmedic_api_rpc::RpcServer;
use opsmedic_core::application::{ActionExecutor, DiagnosticsEngine, RollbackService};
use opsmedic_core::port::id_provider::UuidProvider;
use opsmedic_core::port::platform;
use opsmedic_core::port::time_provider::SystemTimeProvider;
use opsmedic_core::port::{AuditLog, EnvFileStore, PlatformCommands, ProcessRunner, SnapshotStore};
use opsmedic_infra_sqlite::{create_pool, run_migrations, SqliteSnapshotRepository};
use opsmedic_infra_system::{EnvFileStoreImpl, JsonlAuditLog, ShellRunner, SystemProbeImpl};

use crate::config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging (JSON format for production)
    let log_format = std::env::var("OPSMEDIC_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("opsmedic=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Opsmedic Host Agent v{} starting...", VERSION);

    // 1.1. Initialize OpenTelemetry (optional)
    if let Err(e) = telemetry::init_telemetry() {
        tracing::warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    }

    // 2. Load configuration
    let config = DaemonConfig::from_env();

    info!(db_path = %config.db_path, "Initializing database...");

    // 3. Initialize database
    let pool = create_pool(&config.db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);

    let snapshots: Arc<dyn SnapshotStore> = Arc::new(SqliteSnapshotRepository::new(
        pool.clone(),
        id_provider,
        time_provider.clone(),
    ));

    let audit: Arc<dyn AuditLog> = Arc::new(JsonlAuditLog::new(
        &config.audit_log_path,
        time_provider.clone(),
    ));

    let runner: Arc<dyn ProcessRunner> = Arc::new(ShellRunner::new());
    let probe = Arc::new(SystemProbeImpl::new());
    let platform: Arc<dyn PlatformCommands> = platform::native_commands();
    let env_file: Arc<dyn EnvFileStore> =
        Arc::new(EnvFileStoreImpl::new(&config.agent.env_file_path));

    let executor = Arc::new(ActionExecutor::new(
        snapshots.clone(),
        runner.clone(),
        audit.clone(),
        platform.clone(),
        env_file.clone(),
        config.agent.clone(),
    ));

    let diagnostics = Arc::new(DiagnosticsEngine::new(
        runner.clone(),
        probe,
        platform.clone(),
        time_provider,
        config.agent.clone(),
    ));

    let rollback = Arc::new(RollbackService::with_default_handlers(
        snapshots.clone(),
        audit.clone(),
        runner.clone(),
        platform.clone(),
        env_file,
    ));

    // 5. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rpc_config = RpcServerConfig {
        port: config.rpc_port,
        ..Default::default()
    };
    let handler = Arc::new(RpcHandler::new(
        executor,
        diagnostics,
        rollback,
        snapshots,
        runner,
        platform,
        audit,
        config.agent.clone(),
    ));
    let rpc_server = RpcServer::new(rpc_config, handler);
    let rpc_handle = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!("System ready. Waiting for requests...");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;

    info!("Shutdown complete.");

    Ok(())
}
