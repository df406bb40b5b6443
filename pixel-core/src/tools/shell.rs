//! Shell command tool
//!
//! Failures never surface as `Err`: they come back inside [`ShellOutcome`] so
//! the execution role can read the error text and react to it.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Result of running a shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when killed or never started
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl ShellOutcome {
    fn failed(stderr: String, duration_ms: u64) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr,
            exit_code: None,
            timed_out: false,
            duration_ms,
        }
    }

    /// stdout on success, `Error running command: <stderr>` otherwise
    pub fn tool_text(&self) -> String {
        if self.success {
            self.stdout.clone()
        } else {
            format!("Error running command: {}", self.error_text())
        }
    }

    /// The most useful error output, falling back to stdout
    ///
    /// Type checkers often report on stdout and leave stderr empty.
    pub fn error_text(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.clone()
        } else {
            self.stdout.clone()
        }
    }
}

/// Run `command` through `sh -c` in `workdir`
///
/// The child is killed if it outlives `timeout`.
#[instrument(skip(timeout), fields(timeout_secs = timeout.as_secs()))]
pub async fn run_shell_command(command: &str, workdir: &Path, timeout: Duration) -> ShellOutcome {
    let start = Instant::now();
    let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, "Failed to start command");
            return ShellOutcome::failed(format!("failed to start: {}", e), elapsed(start));
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let outcome = ShellOutcome {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code(),
                timed_out: false,
                duration_ms: elapsed(start),
            };
            debug!(
                success = outcome.success,
                exit_code = ?outcome.exit_code,
                duration_ms = outcome.duration_ms,
                "Command finished"
            );
            outcome
        }
        Ok(Err(e)) => ShellOutcome::failed(format!("failed to wait: {}", e), elapsed(start)),
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "Command timed out");
            ShellOutcome {
                timed_out: true,
                ..ShellOutcome::failed(
                    format!("timed out after {}s", timeout.as_secs()),
                    elapsed(start),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_success_returns_stdout() {
        let dir = TempDir::new().unwrap();
        let outcome = run_shell_command("echo hello", dir.path(), Duration::from_secs(10)).await;
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.tool_text(), "hello\n");
    }

    #[tokio::test]
    async fn test_failure_reports_stderr() {
        let dir = TempDir::new().unwrap();
        let outcome =
            run_shell_command("echo broken >&2; exit 3", dir.path(), Duration::from_secs(10)).await;
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.tool_text(), "Error running command: broken\n");
    }

    #[tokio::test]
    async fn test_error_text_falls_back_to_stdout() {
        let dir = TempDir::new().unwrap();
        let outcome =
            run_shell_command("echo 'TS2304: x'; exit 1", dir.path(), Duration::from_secs(10))
                .await;
        assert_eq!(outcome.error_text(), "TS2304: x\n");
    }

    #[tokio::test]
    async fn test_runs_in_workdir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let outcome = run_shell_command("ls", dir.path(), Duration::from_secs(10)).await;
        assert!(outcome.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = TempDir::new().unwrap();
        let outcome = run_shell_command("sleep 5", dir.path(), Duration::from_millis(200)).await;
        assert!(outcome.timed_out);
        assert!(!outcome.success);
        assert!(outcome.tool_text().starts_with("Error running command: timed out"));
    }

    #[tokio::test]
    async fn test_missing_workdir() {
        let dir = TempDir::new().unwrap();
        let outcome =
            run_shell_command("true", &dir.path().join("gone"), Duration::from_secs(5)).await;
        assert!(!outcome.success);
        assert!(outcome.stderr.contains("failed to start"));
    }
}
