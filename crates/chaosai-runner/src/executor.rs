//! External command execution

use std::process::Stdio;

use async_trait::async_trait;
use chaosai_common::{ChaosError, Result};
use tokio::process::Command;
use tracing::debug;

/// Combined output and exit status of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// stdout and stderr, interleaved as written
    pub log: String,
    /// Exit status, -1 when terminated by a signal
    pub returncode: i32,
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `cmd` to completion
    async fn execute(&self, cmd: &str) -> Result<CommandOutput>;
}

/// Runs commands through `sh -c`
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellExecutor;

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, cmd: &str) -> Result<CommandOutput> {
        debug!(cmd, "Running shell command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(format!("exec 2>&1\n{}", cmd))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ChaosError::Execution(format!("failed to spawn `{}`: {}", cmd, e)))?;

        Ok(CommandOutput {
            log: String::from_utf8_lossy(&output.stdout).into_owned(),
            returncode: output.status.code().unwrap_or(-1),
        })
    }
}

/// Pretends every command succeeded without output
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

#[async_trait]
impl CommandExecutor for DryRunExecutor {
    async fn execute(&self, cmd: &str) -> Result<CommandOutput> {
        debug!(cmd, "Dry run, command not executed");
        Ok(CommandOutput {
            log: String::new(),
            returncode: 0,
        })
    }
}

/// `yes`, `y`, `true` or `1`, case-insensitive
pub fn env_is_truthy(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "yes" | "y" | "true" | "1"))
        .unwrap_or(false)
}
