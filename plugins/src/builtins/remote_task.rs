use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use harbor_core::error::ExecutorError;
use harbor_core::executor::{ExecutionElement, ExecutionRequest, ExecutionResponse};
use harbor_core::package::PackageStore;

use super::local_dependency::{resolve_config_path, LocalDependencies, LocalDependencyOptions};

pub const REMOTE_TASK_KIND: &str = "harbor.dev/RemoteTask";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteTaskOptions {
    pub dependency: LocalDependencyOptions,
    /// Task name inside the dependency.
    pub run: String,
    #[serde(rename = "isDepenedencyLocal", alias = "isDependencyLocal")]
    pub is_dependency_local: bool,
    pub artifacts: Vec<String>,
    pub inputs: Vec<String>,
}

/// Runs a named task of a package loaded earlier by `LocalDependencyManager`.
pub struct RemoteExecutor {
    store: Arc<PackageStore>,
    locals: Arc<LocalDependencies>,
}

impl RemoteExecutor {
    pub fn new(store: Arc<PackageStore>, locals: Arc<LocalDependencies>) -> Self {
        Self { store, locals }
    }
}

#[async_trait]
impl ExecutionElement for RemoteExecutor {
    fn kinds(&self) -> &[&'static str] {
        &[REMOTE_TASK_KIND]
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, ExecutorError> {
        let opts: RemoteTaskOptions = request.decode_options()?;
        if !opts.is_dependency_local {
            return Err(ExecutorError::Unsupported(format!(
                "remote dependency {}",
                opts.dependency.path
            )));
        }

        let config_path = resolve_config_path(&self.store, &request, &opts.dependency.path);
        let dep = self
            .locals
            .get(&config_path)
            .ok_or_else(|| ExecutorError::DependencyNotLoaded(opts.dependency.path.clone()))?;

        let ctx = dep
            .package
            .execution_context()
            .with_cache(request.with_cache)
            .with_force_clean(request.force_clean)
            .with_workspace_root(request.workspace_root.clone())
            .with_cancel_token(request.cancel.clone());
        tracing::debug!(
            task_id = %request.task.id,
            dependency = %opts.dependency.path,
            run = %opts.run,
            "running task of local dependency"
        );

        dep.tree
            .run_task(&ctx, &opts.run)
            .await
            .map_err(|source| ExecutorError::Remote {
                dependency: opts.dependency.path.clone(),
                task: opts.run.clone(),
                source,
            })?;
        Ok(ExecutionResponse::default())
    }
}
