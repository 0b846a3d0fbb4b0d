use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::cache::{Cache, NoopCache};
use crate::error::ExecutorError;

use super::context::{ExecutionContext, TaskContext, TaskIdentity};
use super::scheduler;

/// Terminal result of a task. Failures are shared so every caller observes the
/// same error instance.
pub type TaskOutcome = Result<(), Arc<ExecutorError>>;

/// Runs the work of a single task once its dependencies have succeeded.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, ctx: &TaskContext, options: &Value) -> Result<(), ExecutorError>;
}

/// A node of the execution graph.
///
/// Dependencies are shared: two parents may hold the same child. The outcome
/// cell makes execution single-flight, so a child reached from several parents
/// at once runs exactly once and every parent sees the same outcome.
pub struct Task {
    id: String,
    kind: String,
    options: Value,
    dependencies: Vec<Arc<Task>>,
    dependency_ids: HashSet<String>,
    dispatcher: Arc<dyn Dispatcher>,
    outcome: OnceCell<TaskOutcome>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        options: Value,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            options,
            dependencies: Vec::new(),
            dependency_ids: HashSet::new(),
            dispatcher,
            outcome: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    pub fn dependencies(&self) -> &[Arc<Task>] {
        &self.dependencies
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub fn identity(&self) -> TaskIdentity {
        TaskIdentity {
            id: self.id.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Append `dep` unless a dependency with the same id is already attached.
    /// Returns whether it was added.
    pub fn add_dependency(&mut self, dep: Arc<Task>) -> bool {
        if !self.dependency_ids.insert(dep.id.clone()) {
            return false;
        }
        self.dependencies.push(dep);
        true
    }

    pub fn is_done(&self) -> bool {
        self.outcome.initialized()
    }

    /// Memoized outcome, if the task has completed.
    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.outcome.get()
    }

    /// Execute dependencies, then this task's own work.
    ///
    /// Once completed, further calls return the memoized outcome without
    /// touching dependencies or the dispatcher.
    pub fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, TaskOutcome> {
        Box::pin(async move {
            if let Some(outcome) = self.outcome.get() {
                tracing::debug!(task_id = %self.id, "task has already been done during this run, returning early");
                return outcome.clone();
            }
            self.outcome.get_or_init(|| self.run(ctx)).await.clone()
        })
    }

    async fn run(&self, ctx: &ExecutionContext) -> TaskOutcome {
        let started = Instant::now();
        tracing::debug!(task_id = %self.id, kind = %self.kind, "executing task");

        let scope = TaskContext {
            exec: ctx.child(),
            task: self.identity(),
            cache: self.task_cache(ctx),
            dispatcher: self.dispatcher.clone(),
        };

        let failures = scheduler::execute_dependencies(&self.dependencies, &scope.exec).await;
        if !failures.is_empty() {
            scope.exec.cancel_token().cancel();
            let err = ExecutorError::DependencyFailure {
                task_id: self.id.clone(),
                failures,
            };
            tracing::warn!(task_id = %self.id, error = %err, "task's children failed to execute");
            return Err(Arc::new(err));
        }

        match self.dispatcher.dispatch(&scope, &self.options).await {
            Ok(()) => {
                tracing::debug!(
                    task_id = %self.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "task finished"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(task_id = %self.id, error = %err, "task failed to execute");
                scope.exec.cancel_token().cancel();
                Err(Arc::new(ExecutorError::TaskFailed {
                    task_id: self.id.clone(),
                    source: Box::new(err),
                }))
            }
        }
    }

    /// Cache I/O problems degrade to a cache that never hits.
    fn task_cache(&self, ctx: &ExecutionContext) -> Arc<dyn Cache> {
        if !ctx.cache_enabled() {
            return NoopCache::shared();
        }
        match ctx.cache().sub_cache(&self.id) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!(task_id = %self.id, error = %err, "failed to get sub cache, running uncached");
                NoopCache::shared()
            }
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field(
                "dependencies",
                &self.dependencies.iter().map(|d| d.id()).collect::<Vec<_>>(),
            )
            .field("done", &self.is_done())
            .finish()
    }
}
