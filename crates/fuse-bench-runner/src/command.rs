//! Shared command execution with streaming output
//!
//! Provides a unified command runner that streams child output into the
//! tracing log, line by line, so everything a build or benchmark prints
//! ends up in the instance log.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

/// Configuration for command execution
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Command timeout (kills process if exceeded)
    pub timeout: Duration,
    /// Time to wait for streaming tasks to flush after command completes
    pub stream_flush_timeout: Duration,
}

impl CommandConfig {
    /// Configuration for package installation (10 minute timeout)
    pub fn for_install() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            stream_flush_timeout: Duration::from_secs(2),
        }
    }

    /// Configuration for source builds (30 minute timeout)
    pub fn for_build() -> Self {
        Self {
            timeout: Duration::from_secs(1800),
            stream_flush_timeout: Duration::from_secs(2),
        }
    }

    /// Configuration for long-running benchmark commands (2 hour timeout)
    pub fn for_benchmark() -> Self {
        Self {
            timeout: Duration::from_secs(7200),
            stream_flush_timeout: Duration::from_secs(5),
        }
    }

    /// Create with custom timeout, default stream flush timeout
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            stream_flush_timeout: Duration::from_secs(2),
        }
    }
}

/// Run a command and stream its output to the log
///
/// # Returns
/// * `Ok(true)` if command succeeded
/// * `Ok(false)` if command failed with non-zero exit
/// * `Err` if timeout, spawn failure, or other error
pub async fn run_command(cmd: &str, args: &[&str], config: &CommandConfig) -> Result<bool> {
    let mut command = Command::new(cmd);
    command.args(args);
    run(command, cmd, config).await
}

/// Run a command in a working directory
pub async fn run_command_in(
    cmd: &str,
    args: &[&str],
    cwd: &Path,
    config: &CommandConfig,
) -> Result<bool> {
    let mut command = Command::new(cmd);
    command.args(args).current_dir(cwd);
    run(command, cmd, config).await
}

/// Run a command with additional environment variables
pub async fn run_command_with_env(
    cmd: &str,
    args: &[&str],
    envs: &[(&str, String)],
    config: &CommandConfig,
) -> Result<bool> {
    let mut command = Command::new(cmd);
    command.args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    run(command, cmd, config).await
}

async fn run(mut command: Command, label: &str, config: &CommandConfig) -> Result<bool> {
    info!(
        cmd = %label,
        timeout_secs = config.timeout.as_secs(),
        "Running command"
    );

    let mut child = command
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn command: {}", label))?;

    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let stdout_label = label.to_string();
    let stderr_label = label.to_string();

    // Stream stdout
    let stdout_handle = tokio::spawn(async move {
        let reader = BufReader::new(stdout);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(cmd = %stdout_label, "{}", line);
        }
    });

    // Stream stderr
    let stderr_handle = tokio::spawn(async move {
        let reader = BufReader::new(stderr);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(cmd = %stderr_label, stream = "stderr", "{}", line);
        }
    });

    // Wait for command with timeout
    let wait_result = tokio::time::timeout(config.timeout, child.wait()).await;

    let success = match wait_result {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => return Err(e).context("Failed waiting for command"),
        Err(_) => {
            warn!(
                cmd = %label,
                timeout_secs = config.timeout.as_secs(),
                "Command timed out, killing process"
            );
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill timed-out process");
            }
            // Give streaming tasks a moment to flush remaining output
            tokio::time::sleep(Duration::from_millis(500)).await;
            return Err(anyhow::anyhow!(
                "Command '{}' timed out after {}s",
                label,
                config.timeout.as_secs()
            ));
        }
    };

    // Wait for streaming to finish with timeout
    let _ = tokio::time::timeout(config.stream_flush_timeout, stdout_handle).await;
    let _ = tokio::time::timeout(config.stream_flush_timeout, stderr_handle).await;

    Ok(success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command_returns_true() {
        let ok = run_command("true", &[], &CommandConfig::with_timeout_secs(10))
            .await
            .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn test_failing_command_returns_false() {
        let ok = run_command("false", &[], &CommandConfig::with_timeout_secs(10))
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_missing_command_is_an_error() {
        let result = run_command(
            "definitely-not-a-real-binary",
            &[],
            &CommandConfig::with_timeout_secs(10),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_command_timeout_kills_process() {
        let config = CommandConfig {
            timeout: Duration::from_millis(100),
            stream_flush_timeout: Duration::from_millis(100),
        };
        let result = run_command("sleep", &["5"], &config).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_env_vars_are_passed_to_child() {
        let ok = run_command_with_env(
            "sh",
            &["-c", "test \"$FUSE_BENCH_TEST_VAR\" = expected"],
            &[("FUSE_BENCH_TEST_VAR", "expected".to_string())],
            &CommandConfig::with_timeout_secs(10),
        )
        .await
        .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn test_working_directory_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "x").unwrap();
        let ok = run_command_in(
            "test",
            &["-f", "marker"],
            dir.path(),
            &CommandConfig::with_timeout_secs(10),
        )
        .await
        .unwrap();
        assert!(ok);
    }
}
