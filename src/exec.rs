//! Process execution boundary for iai_core
//!
//! Spawns external tools (GDAL utilities, shell commands, GRASS module
//! binaries) with piped stdio and an optional deterministic timeout.
//! Failures are captured in the returned value, never raised.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Captured outcome of one spawned process
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Spawn failure or timeout, when the process never produced a status
    pub error: Option<String>,
}

impl CommandOutput {
    fn failed(error: String) -> Self {
        Self {
            code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error),
        }
    }
}

/// Marker reported when a process exceeds its time budget
pub const TIMEOUT_MARKER: &str = "timeout exceeded";

/// Run an argument vector, optionally bounded by a timeout. The first
/// element is the executable; no shell interpretation is applied, so
/// arguments containing spaces cannot be expressed.
pub async fn run_command(argv: &[String], time_limit: Option<Duration>) -> CommandOutput {
    let Some((program, args)) = argv.split_first() else {
        return CommandOutput::failed("empty argument vector".to_string());
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return CommandOutput::failed(e.to_string()),
    };

    let waited = match time_limit {
        Some(limit) => match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result,
            // kill_on_drop reaps the child when the wait future is dropped
            Err(_) => return CommandOutput::failed(TIMEOUT_MARKER.to_string()),
        },
        None => child.wait_with_output().await,
    };

    match waited {
        Ok(output) => CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            error: None,
        },
        Err(e) => CommandOutput::failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_captures_stdout_and_status() {
        let out = run_command(&argv(&["echo", "hello"]), Some(Duration::from_secs(10))).await;
        assert_eq!(out.code, Some(0));
        assert_eq!(out.stdout, "hello\n");
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let out = run_command(&argv(&["sh", "-c", "echo oops >&2; exit 3"]), None).await;
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stderr, "oops\n");
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_captured() {
        let out = run_command(&argv(&["definitely-not-a-real-binary-xyz"]), None).await;
        assert!(out.code.is_none());
        assert!(out.error.is_some());
    }

    #[tokio::test]
    async fn test_timeout() {
        let out = run_command(&argv(&["sleep", "30"]), Some(Duration::from_millis(200))).await;
        assert!(out.code.is_none());
        assert_eq!(out.error.as_deref(), Some(TIMEOUT_MARKER));
    }

    #[tokio::test]
    async fn test_empty_argv() {
        let out = run_command(&[], None).await;
        assert!(out.error.is_some());
    }
}
