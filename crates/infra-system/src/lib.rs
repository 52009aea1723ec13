// Opsmedic Infrastructure - System Adapters
// Implements: ProcessRunner, SystemProbe, EnvFileStore, AuditLog

pub mod audit_jsonl;
pub mod env_file_store;
pub mod shell_runner;
pub mod system_probe_impl;

pub use audit_jsonl::JsonlAuditLog;
pub use env_file_store::EnvFileStoreImpl;
pub use shell_runner::ShellRunner;
pub use system_probe_impl::SystemProbeImpl;
