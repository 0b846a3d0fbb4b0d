use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use harbor_core::cache::{Cache, ERROR_LOG_KEY, INFO_LOG_KEY};
use harbor_core::error::ExecutorError;
use harbor_core::executor::{ExecutionElement, ExecutionRequest, ExecutionResponse};
use harbor_core::runner::{self, CommandOutput, CommandSpec, OutputStream};

pub const EXEC_COMMAND_KIND: &str = "harbor.dev/ExecCommand";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecOptions {
    pub executable: String,
    pub args: Vec<String>,
    /// Declared input files; informational only.
    pub inputs: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Spawns an external process, or replays its captured output from the
/// task's cache namespace.
#[derive(Debug, Default)]
pub struct ExecCommand;

#[async_trait]
impl ExecutionElement for ExecCommand {
    fn kinds(&self) -> &[&'static str] {
        &[EXEC_COMMAND_KIND]
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, ExecutorError> {
        let opts: ExecOptions = request.decode_options()?;
        if opts.executable.is_empty() {
            return Err(ExecutorError::InvalidOptions {
                kind: request.kind.clone(),
                message: "missing executable".to_string(),
            });
        }
        let task_id = request.task.id.as_str();
        tracing::debug!(
            task_id,
            working_dir = %request.working_dir.display(),
            inputs = ?opts.inputs,
            "starting task"
        );

        if request.force_clean {
            tracing::debug!(task_id, "force clean, skipping replay");
        } else if replay_from_cache(request.cache.as_ref(), task_id) {
            tracing::info!(task_id, "replayed from cache");
            return Ok(ExecutionResponse::cached());
        }

        let spec = CommandSpec {
            executable: opts.executable,
            args: opts.args,
            env: opts.env,
            working_dir: request.working_dir.clone(),
            label: task_id.to_string(),
        };
        let output = runner::run_command(&spec, &request.cancel).await?;
        tracing::debug!(task_id, duration_ms = output.duration_ms, "command finished");

        store_output(request.cache.as_ref(), task_id, &output);
        Ok(ExecutionResponse::default())
    }
}

/// Replay whichever logs are cached. A hit on either log counts as a hit.
fn replay_from_cache(cache: &dyn Cache, task_id: &str) -> bool {
    let info = read_cached(cache, task_id, INFO_LOG_KEY);
    let error = read_cached(cache, task_id, ERROR_LOG_KEY);
    if info.is_none() && error.is_none() {
        return false;
    }
    if let Some(data) = info {
        runner::replay(OutputStream::Stdout, task_id, &data);
    }
    if let Some(data) = error {
        runner::replay(OutputStream::Stderr, task_id, &data);
    }
    true
}

fn read_cached(cache: &dyn Cache, task_id: &str, key: &str) -> Option<Vec<u8>> {
    match cache.get(key) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(task_id, cache_key = key, error = %e, "cache read failed, treating as miss");
            None
        }
    }
}

fn store_output(cache: &dyn Cache, task_id: &str, output: &CommandOutput) {
    for (key, data) in [(INFO_LOG_KEY, &output.stdout), (ERROR_LOG_KEY, &output.stderr)] {
        if let Err(e) = cache.add(key, data) {
            tracing::warn!(task_id, cache_key = key, error = %e, "failed to write cache entry");
        }
    }
}
