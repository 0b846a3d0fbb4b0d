use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;

use super::io_pump::{self, OutputStream};

/// A single external command invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub executable: String,
    pub args: Vec<String>,
    /// Merged over the inherited environment.
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    /// Task id the output lines are logged against.
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration_ms: u64,
}

/// Spawn `spec` and wait for it, capturing both output streams.
///
/// Exactly one of three outcomes is reported: clean exit, failure (spawn
/// error or non-zero exit), or cancellation through `cancel`, in which case
/// the child is killed before returning.
pub async fn run_command(
    spec: &CommandSpec,
    cancel: &CancellationToken,
) -> Result<CommandOutput, ExecutorError> {
    if cancel.is_cancelled() {
        return Err(ExecutorError::Cancelled {
            task_id: spec.label.clone(),
        });
    }

    let started = Instant::now();
    let mut child = Command::new(&spec.executable)
        .args(&spec.args)
        .envs(&spec.env)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutorError::Process {
            executable: spec.executable.clone(),
            message: format!("failed to start: {e}"),
        })?;

    tracing::debug!(
        task_id = %spec.label,
        executable = %spec.executable,
        args = ?spec.args,
        pid = ?child.id(),
        "spawned process"
    );

    let mut stdout_pump = child
        .stdout
        .take()
        .map(|rd| io_pump::pump(rd, OutputStream::Stdout, spec.label.clone()));
    let mut stderr_pump = child
        .stderr
        .take()
        .map(|rd| io_pump::pump(rd, OutputStream::Stderr, spec.label.clone()));

    // Output is only complete once both pipes close, which may outlive the
    // direct child when it leaves background processes behind.
    let finished = {
        let run = async {
            let status = child.wait().await.map_err(|e| ExecutorError::Process {
                executable: spec.executable.clone(),
                message: e.to_string(),
            })?;
            let stdout = collect(stdout_pump.as_mut(), &spec.executable).await?;
            let stderr = collect(stderr_pump.as_mut(), &spec.executable).await?;
            Ok::<_, ExecutorError>((status, stdout, stderr))
        };
        tokio::select! {
            result = run => Some(result),
            _ = cancel.cancelled() => None,
        }
    };

    let Some(result) = finished else {
        tracing::warn!(task_id = %spec.label, "cancelled, killing process");
        if !matches!(child.try_wait(), Ok(Some(_))) {
            if let Err(e) = child.kill().await {
                tracing::warn!(task_id = %spec.label, error = %e, "failed to kill process");
            }
        }
        for pump in [stdout_pump, stderr_pump].into_iter().flatten() {
            pump.abort();
        }
        return Err(ExecutorError::Cancelled {
            task_id: spec.label.clone(),
        });
    };
    let (status, stdout, stderr) = result?;

    if !status.success() {
        return Err(ExecutorError::Process {
            executable: spec.executable.clone(),
            message: format!("exited with {status}"),
        });
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

async fn collect(
    handle: Option<&mut tokio::task::JoinHandle<Result<Vec<u8>, ExecutorError>>>,
    executable: &str,
) -> Result<Vec<u8>, ExecutorError> {
    match handle {
        Some(handle) => handle.await.map_err(|e| ExecutorError::Process {
            executable: executable.to_string(),
            message: format!("output reader failed: {e}"),
        })?,
        None => Ok(Vec::new()),
    }
}
