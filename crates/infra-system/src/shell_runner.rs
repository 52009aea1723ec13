// Shell Process Runner
// One child process per call, concurrent capped output drains, SIGTERM on
// timeout with SIGKILL backstop via kill_on_drop.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use opsmedic_core::port::{ProcessRunner, RunError, RunOptions, RunOutput};

/// Default per-stream capture cap
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// ProcessRunner backed by the host shell (`sh -c` / `cmd /C`)
///
/// The command line is handed to the shell verbatim. Output beyond the byte
/// cap is discarded (the stream is still drained to EOF so the child never
/// stalls on a full pipe) and the result is flagged `truncated`.
pub struct ShellRunner {
    max_output_bytes: usize,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_max_output_bytes(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    fn shell_command(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes
async fn drain_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> (String, bool) {
    let mut buf: Vec<u8> = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() < cap {
                    let take = n.min(cap - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }

    (String::from_utf8_lossy(&buf).into_owned(), truncated)
}

/// SIGTERM the child; the SIGKILL backstop fires when the handle drops
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }
}

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(&self, command: &str, opts: RunOptions) -> Result<RunOutput, RunError> {
        debug!(command = %command, timeout_ms = ?opts.timeout_ms, "Spawning shell command");

        let mut child = Self::shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunError::SpawnFailed(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunError::Io("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunError::Io("stderr not captured".to_string()))?;

        let cap = self.max_output_bytes;
        let stdout_task = tokio::spawn(drain_capped(stdout, cap));
        let stderr_task = tokio::spawn(drain_capped(stderr, cap));

        let status = match opts.timeout_ms {
            Some(timeout_ms) => {
                match timeout(Duration::from_millis(timeout_ms), child.wait()).await {
                    Ok(waited) => waited.map_err(|e| RunError::Io(e.to_string()))?,
                    Err(_) => {
                        warn!(command = %command, timeout_ms, "Command timed out; terminating child");
                        terminate(&mut child);
                        // the child's eventual exit is not awaited; this call
                        // is a hard failure
                        return Err(RunError::Timeout { timeout_ms });
                    }
                }
            }
            None => child.wait().await.map_err(|e| RunError::Io(e.to_string()))?,
        };

        let (stdout, stdout_truncated) = stdout_task
            .await
            .map_err(|e| RunError::Io(e.to_string()))?;
        let (stderr, stderr_truncated) = stderr_task
            .await
            .map_err(|e| RunError::Io(e.to_string()))?;

        let exit_code = status.code().unwrap_or(-1);
        let output = RunOutput {
            exit_code,
            stdout,
            stderr,
            truncated: stdout_truncated || stderr_truncated,
        };

        debug!(
            command = %command,
            exit_code = %exit_code,
            truncated = %output.truncated,
            "Shell command completed"
        );

        if status.success() || opts.ignore_exit_code {
            Ok(output)
        } else {
            let stderr = if output.stderr.is_empty() {
                output.stdout
            } else {
                output.stderr
            };
            Err(RunError::ProcessFailed { exit_code, stderr })
        }
    }
}
