// Port Layer - Interfaces for external dependencies

pub mod audit_log;
pub mod env_file;
pub mod id_provider; // For deterministic testing
pub mod platform;
pub mod process_runner;
pub mod snapshot_store;
pub mod system_probe;
pub mod time_provider;

// Re-exports
pub use audit_log::AuditLog;
pub use env_file::EnvFileStore;
pub use id_provider::IdProvider;
pub use platform::{PlatformCommands, UnixCommands, WindowsCommands};
pub use process_runner::{ProcessRunner, RunError, RunOptions, RunOutput};
pub use snapshot_store::SnapshotStore;
pub use system_probe::{CpuStats, MemoryStats, NetworkInterfaceStats, SystemProbe};
pub use time_provider::TimeProvider;
