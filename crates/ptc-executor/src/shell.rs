//! Shared "run a command with a timeout" helper — the same
//! `tokio::time::timeout` + `Command::output()` shape used throughout
//! this workspace (`ptc-git::GitLayer::git`), reused here for `shell` and
//! `native`'s cargo/nix sub-modes.

use ptc_core::Error;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const STDOUT_LIMIT: usize = 5000;
const STDERR_LIMIT: usize = 2000;

#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

fn truncate(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

pub async fn run(command: &str, root: &Path, timeout_secs: u64) -> Result<ShellOutput, Error> {
    let output = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        Command::new("bash").arg("-c").arg(command).current_dir(root).output(),
    )
    .await
    .map_err(|_| Error::timeout(command, timeout_secs))?
    .map_err(|e| Error::Internal(e.to_string()))?;

    Ok(ShellOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: truncate(&String::from_utf8_lossy(&output.stdout), STDOUT_LIMIT),
        stderr: truncate(&String::from_utf8_lossy(&output.stderr), STDERR_LIMIT),
    })
}
