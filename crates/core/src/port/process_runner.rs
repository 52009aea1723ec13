// Process Runner Port
// Abstraction for running external commands through a shell interpreter

use async_trait::async_trait;
use thiserror::Error;

/// Per-call options
///
/// The command line is a pass-through to the shell; the runner performs no
/// argument parsing or validation. Injection at this boundary is an accepted
/// property of the contract, not something the runner mitigates.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Wall-clock budget; no timeout when absent
    pub timeout_ms: Option<u64>,
    /// Treat any exit code as success (exit code still recorded)
    pub ignore_exit_code: bool,
}

impl RunOptions {
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms: Some(timeout_ms),
            ..Self::default()
        }
    }

    pub fn ignoring_exit_code(mut self) -> Self {
        self.ignore_exit_code = true;
        self
    }
}

/// Captured outcome of a completed command
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Output exceeded the runner's byte cap and was truncated
    pub truncated: bool,
}

/// Runner failure taxonomy
#[derive(Error, Debug, Clone)]
pub enum RunError {
    #[error("Failed to spawn command: {0}")]
    SpawnFailed(String),

    #[error("Command failed ({exit_code}): {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },

    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(String),
}

/// Process Runner port
///
/// Spawns exactly one child process per call, drains stdout/stderr
/// concurrently, and enforces the optional timeout with forced termination.
/// No retry logic at this layer; retries are a caller concern.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a shell command line to completion
    ///
    /// # Errors
    /// - `RunError::SpawnFailed` if the shell could not be started
    /// - `RunError::ProcessFailed` on non-zero exit without `ignore_exit_code`
    /// - `RunError::Timeout` if `timeout_ms` elapses first (child terminated)
    async fn run(&self, command: &str, opts: RunOptions) -> Result<RunOutput, RunError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Scripted runner: responds by command substring match
    pub struct MockProcessRunner {
        scripts: Mutex<Vec<(String, Result<RunOutput, RunError>)>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockProcessRunner {
        pub fn new() -> Self {
            Self {
                scripts: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Respond with `result` to any command containing `needle`
        pub fn on(self, needle: impl Into<String>, result: Result<RunOutput, RunError>) -> Self {
            self.scripts.lock().unwrap().push((needle.into(), result));
            self
        }

        pub fn on_stdout(self, needle: impl Into<String>, stdout: impl Into<String>) -> Self {
            self.on(
                needle,
                Ok(RunOutput {
                    exit_code: 0,
                    stdout: stdout.into(),
                    stderr: String::new(),
                    truncated: false,
                }),
            )
        }

        /// Commands received, in call order
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Default for MockProcessRunner {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn run(&self, command: &str, _opts: RunOptions) -> Result<RunOutput, RunError> {
            self.calls.lock().unwrap().push(command.to_string());

            let scripts = self.scripts.lock().unwrap();
            for (needle, result) in scripts.iter() {
                if command.contains(needle.as_str()) {
                    return result.clone();
                }
            }
            // Unscripted commands succeed with empty output
            Ok(RunOutput::default())
        }
    }

    /// Runner that panics on every call (fan-out isolation testing)
    pub struct PanickingRunner;

    #[async_trait]
    impl ProcessRunner for PanickingRunner {
        async fn run(&self, command: &str, _opts: RunOptions) -> Result<RunOutput, RunError> {
            panic!("runner invoked unexpectedly: {}", command);
        }
    }
}
