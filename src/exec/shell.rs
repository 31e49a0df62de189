// src/exec/shell.rs

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::ScheduledProcess;
use crate::exec::backend::{CommandExecutor, ExecFuture};

/// Runs commands with `sh -c` (`cmd /C` on Windows) inside the process's
/// working directory.
///
/// stdout and stderr are drained line by line into debug logs so pipes never
/// fill up. A process killed by a signal reports exit code -1.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute<'a>(&'a self, process: &'a ScheduledProcess) -> ExecFuture<'a> {
        Box::pin(run_shell(process))
    }
}

async fn run_shell(process: &ScheduledProcess) -> Result<i32> {
    debug!(
        process = %process.name,
        cmd = %process.command,
        workdir = ?process.workdir,
        "spawning shell"
    );

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&process.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&process.command);
        c
    };

    cmd.current_dir(&process.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning shell for process '{}'", process.name))?;

    if let Some(stdout) = child.stdout.take() {
        let name = process.name.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(process = %name, "stdout: {}", line);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        let name = process.name.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(process = %name, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process '{}'", process.name))?;

    let code = status.code().unwrap_or(-1);
    info!(
        process = %process.name,
        exit_code = code,
        success = status.success(),
        "shell command exited"
    );

    Ok(code)
}
