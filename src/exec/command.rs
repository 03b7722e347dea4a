// src/exec/command.rs

//! Shell command executor.
//!
//! Each node's input is a command line run through `sh -c` (`cmd /C` on
//! Windows). Upstream outputs are written to the child's stdin, one per line,
//! and the child's trimmed stdout becomes the node's output.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::DispatchedNode;
use crate::errors::ExecutionError;
use crate::exec::{ExecFuture, Executor};

#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    working_dir: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir` instead of the current directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl Executor for CommandExecutor {
    type Input = String;
    type Output = String;

    fn execute(
        &self,
        node: DispatchedNode<String, String>,
        cancel: CancellationToken,
    ) -> ExecFuture<String> {
        let working_dir = self.working_dir.clone();
        Box::pin(async move { run_node(node, working_dir, cancel).await })
    }
}

async fn run_node(
    node: DispatchedNode<String, String>,
    working_dir: Option<PathBuf>,
    cancel: CancellationToken,
) -> std::result::Result<String, ExecutionError> {
    let upstream: Vec<&str> = node.upstream.iter().map(|up| up.output.as_str()).collect();

    // Structural nodes without a command just forward what they received.
    if node.input.trim().is_empty() {
        debug!(node = %node.id, name = %node.name, "no command; forwarding upstream outputs");
        return Ok(upstream.join("\n"));
    }

    let stdin_payload = upstream.join("\n");

    tokio::select! {
        res = run_command(&node, &stdin_payload, working_dir) => {
            res.map_err(|err| ExecutionError::failed(format!("{err:#}")))?
        }
        _ = cancel.cancelled() => {
            // Dropping the command future drops the child; kill_on_drop reaps it.
            info!(node = %node.id, name = %node.name, "cancellation requested; killing process");
            Err(ExecutionError::Cancelled)
        }
    }
}

async fn run_command(
    node: &DispatchedNode<String, String>,
    stdin_payload: &str,
    working_dir: Option<PathBuf>,
) -> Result<std::result::Result<String, ExecutionError>> {
    info!(node = %node.id, name = %node.name, cmd = %node.input, "starting node process");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&node.input);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&node.input);
        c
    };

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for node '{}'", node.name))?;

    if let Some(mut stdin) = child.stdin.take() {
        let payload = stdin_payload.as_bytes().to_vec();
        let name = node.name.clone();
        tokio::spawn(async move {
            // A child that never reads stdin closes the pipe early; not an error.
            if let Err(e) = stdin.write_all(&payload).await {
                debug!(node = %name, error = %e, "stdin closed before upstream outputs were written");
            }
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for process of node '{}'", node.name))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(node = %node.id, "stderr: {}", line);
    }

    let code = output.status.code().unwrap_or(-1);
    info!(
        node = %node.id,
        name = %node.name,
        exit_code = code,
        success = output.status.success(),
        "node process exited"
    );

    if !output.status.success() {
        let detail = stderr.lines().last().unwrap_or("").trim();
        warn!(node = %node.id, exit_code = code, "node process failed");
        return Ok(Err(ExecutionError::failed(if detail.is_empty() {
            format!("exit code {code}")
        } else {
            format!("exit code {code}: {detail}")
        })));
    }

    Ok(Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string()))
}
