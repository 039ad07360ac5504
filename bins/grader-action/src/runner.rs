//! Process Runner - Command Execution with Timeout
//!
//! **Core Responsibility:**
//! Run a shell command with injected stdin under a wall-clock timeout and
//! capture its stdout.
//!
//! **Critical Properties:**
//! - Knows nothing about scoring or the test report format
//! - Children only see the `ChildEnvironment` allowlist
//! - A timeout is always reported as `TIMEOUT_MESSAGE`
//! - Partial stdout is returned even when the command failed or timed out

use crate::config::ChildEnvironment;
use anyhow::{bail, Context, Result};
use grader_common::types::ExecutionResult;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Error text for any command stopped by the timeout
pub const TIMEOUT_MESSAGE: &str = "Command was killed due to timeout";

const SHELL: &str = "/bin/sh";

pub struct ProcessRunner {
    env: ChildEnvironment,
}

impl ProcessRunner {
    pub fn new(env: ChildEnvironment) -> Self {
        Self { env }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(SHELL);
        cmd.arg("-c")
            .arg(command)
            .env_clear()
            .envs(self.env.vars())
            .kill_on_drop(true);
        cmd
    }

    /// Run the graded command, feeding `stdin` and capturing stdout
    ///
    /// Never fails: spawn errors, non-zero exits and timeouts all end up in
    /// `ExecutionResult::error` next to whatever stdout was captured.
    #[instrument(skip(self, stdin), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn execute(&self, command: &str, stdin: &str, timeout: Duration) -> ExecutionResult {
        let start = Instant::now();

        let mut proc = match self
            .command(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(proc) => proc,
            Err(e) => {
                warn!(error = %e, "Failed to spawn command");
                return ExecutionResult {
                    output: String::new(),
                    error: Some(format!("Command failed: {}\n{}", command, e)),
                    elapsed: start.elapsed(),
                };
            }
        };

        let child_stdin = proc.stdin.take();
        let child_stdout = proc.stdout.take();
        let child_stderr = proc.stderr.take();

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let res = {
            let feed_stdin = async {
                if let Some(mut pipe) = child_stdin {
                    match pipe.write_all(stdin.as_bytes()).await {
                        Ok(()) => {}
                        // The child is free to exit without reading its input
                        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                        Err(e) => return Err(e),
                    }
                    // dropping the pipe closes the child's stdin
                }
                Ok::<(), io::Error>(())
            };
            let read_stdout = async {
                if let Some(mut pipe) = child_stdout {
                    pipe.read_to_end(&mut stdout_buf).await?;
                }
                Ok::<(), io::Error>(())
            };
            let read_stderr = async {
                if let Some(mut pipe) = child_stderr {
                    pipe.read_to_end(&mut stderr_buf).await?;
                }
                Ok::<(), io::Error>(())
            };

            tokio::time::timeout(timeout, async {
                tokio::try_join!(feed_stdin, read_stdout, read_stderr, proc.wait())
            })
            .await
        };

        let error = match res {
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Command timed out, killing it");
                proc.kill()
                    .await
                    .unwrap_or_else(|e| warn!(error = %e, "Failed to kill timed-out command"));
                Some(TIMEOUT_MESSAGE.to_string())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to communicate with command");
                Some(format!("Command failed: {}\n{}", command, e))
            }
            Ok(Ok((_, _, _, status))) if status.success() => None,
            Ok(Ok((_, _, _, status))) => Some(failure_message(command, status, &stderr_buf)),
        };

        let elapsed = start.elapsed();
        let output = String::from_utf8_lossy(&stdout_buf).trim().to_string();

        debug!(
            execution_ms = elapsed.as_millis() as u64,
            stdout_bytes = stdout_buf.len(),
            failed = error.is_some(),
            "Command finished"
        );

        ExecutionResult {
            output,
            error,
            elapsed,
        }
    }

    /// Run a setup command with inherited stdio
    ///
    /// Any failure is fatal for the run, so it is returned as an error instead
    /// of being folded into an `ExecutionResult`.
    #[instrument(skip(self), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn execute_setup(&self, command: &str, timeout: Duration) -> Result<()> {
        let mut proc = self
            .command(command)
            .spawn()
            .with_context(|| format!("Failed to spawn setup command '{}'", command))?;

        match tokio::time::timeout(timeout, proc.wait()).await {
            Err(_) => {
                proc.kill()
                    .await
                    .unwrap_or_else(|e| warn!(error = %e, "Failed to kill timed-out setup command"));
                bail!(TIMEOUT_MESSAGE)
            }
            Ok(Err(e)) => Err(e).context("Failed to wait for setup command"),
            Ok(Ok(status)) if status.success() => {
                debug!("Setup command succeeded");
                Ok(())
            }
            Ok(Ok(status)) => bail!("Setup command failed: {}\n{}", command, status),
        }
    }
}

fn failure_message(command: &str, status: ExitStatus, stderr: &[u8]) -> String {
    let mut message = format!("Command failed: {}\n{}", command, status);
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        message.push('\n');
        message.push_str(stderr);
    }
    message
}
