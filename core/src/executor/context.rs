use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::Cache;

use super::task::Dispatcher;

/// Settings shared by every task of one run, threaded explicitly through
/// `Task::execute` and into each `ExecutionRequest`.
#[derive(Clone)]
pub struct ExecutionContext {
    cache: Arc<dyn Cache>,
    working_dir: PathBuf,
    workspace_root: Option<PathBuf>,
    with_cache: bool,
    force_clean: bool,
    cancel: CancellationToken,
}

impl ExecutionContext {
    /// `cache` is the package root namespace; tasks derive their own from it.
    pub fn new(cache: Arc<dyn Cache>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            working_dir: working_dir.into(),
            workspace_root: None,
            with_cache: true,
            force_clean: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.with_cache = enabled;
        self
    }

    pub fn with_force_clean(mut self, force_clean: bool) -> Self {
        self.force_clean = force_clean;
        self
    }

    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn cache_enabled(&self) -> bool {
        self.with_cache
    }

    pub fn force_clean(&self) -> bool {
        self.force_clean
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Same settings, with a cancellation token that is cancelled whenever this
    /// one is but can also be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            ..self.clone()
        }
    }
}

/// Identity of the task an executor is running for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIdentity {
    pub id: String,
    pub kind: String,
}

/// Per-task view handed to the dispatcher.
#[derive(Clone)]
pub struct TaskContext {
    pub exec: ExecutionContext,
    pub task: TaskIdentity,
    /// Namespace keyed by the task id.
    pub cache: Arc<dyn Cache>,
    /// Dispatcher the task was built with; nested graphs reuse it.
    pub dispatcher: Arc<dyn Dispatcher>,
}
