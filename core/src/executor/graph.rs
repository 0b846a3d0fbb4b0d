use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::error::ExecutorError;
use crate::package::PackageConfig;

use super::context::ExecutionContext;
use super::task::{Dispatcher, Task, TaskOutcome};

/// Id of the synthetic task aggregating the `setup` section.
pub const SETUP_TASK_ID: &str = "setup";
/// Kind of aggregation-only nodes.
pub const NOOP_KIND: &str = "harbor.dev/noop";

/// The realized dependency graph of one package.
///
/// Built once per loaded configuration and never mutated afterwards; running
/// a task only fills in the memoized outcome of the nodes it reaches.
pub struct ExecutionTree {
    setup: Arc<Task>,
    tasks: BTreeMap<String, Arc<Task>>,
}

impl ExecutionTree {
    /// Build the graph for `config`, dispatching every node through `dispatcher`.
    ///
    /// Each construct becomes exactly one [`Task`] however many parents depend
    /// on it. Undefined ids and dependency cycles are rejected.
    pub fn from_config(
        config: &PackageConfig,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<Self, ExecutorError> {
        let mut builder = GraphBuilder {
            config,
            dispatcher: dispatcher.clone(),
            built: HashMap::new(),
            visiting: Vec::new(),
        };

        let mut setup = Task::new(SETUP_TASK_ID, NOOP_KIND, Value::Null, dispatcher);
        for id in &config.setup {
            let task = builder.build(id, Some(SETUP_TASK_ID))?;
            setup.add_dependency(task);
        }

        let mut tasks = BTreeMap::new();
        for (name, id) in &config.tasks {
            let task = builder.build(id, None)?;
            tasks.insert(name.clone(), task);
        }

        tracing::debug!(
            constructs = builder.built.len(),
            tasks = tasks.len(),
            "built execution tree"
        );
        Ok(Self {
            setup: Arc::new(setup),
            tasks,
        })
    }

    pub async fn run_setup(&self, ctx: &ExecutionContext) -> TaskOutcome {
        self.setup.execute(ctx).await
    }

    /// Run the task registered under the user-facing `name`.
    pub async fn run_task(&self, ctx: &ExecutionContext, name: &str) -> TaskOutcome {
        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| Arc::new(ExecutorError::TaskNotFound(name.to_string())))?;
        task.execute(ctx).await
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn setup_task(&self) -> &Arc<Task> {
        &self.setup
    }
}

struct GraphBuilder<'a> {
    config: &'a PackageConfig,
    dispatcher: Arc<dyn Dispatcher>,
    built: HashMap<String, Arc<Task>>,
    visiting: Vec<String>,
}

impl GraphBuilder<'_> {
    fn build(&mut self, id: &str, required_by: Option<&str>) -> Result<Arc<Task>, ExecutorError> {
        if let Some(task) = self.built.get(id) {
            return Ok(task.clone());
        }
        if let Some(pos) = self.visiting.iter().position(|v| v == id) {
            let mut cycle = self.visiting[pos..].to_vec();
            cycle.push(id.to_string());
            return Err(ExecutorError::CycleDetected(format_cycle_path(&cycle)));
        }

        let construct =
            self.config
                .constructs
                .get(id)
                .ok_or_else(|| ExecutorError::ConstructNotFound {
                    id: id.to_string(),
                    required_by: required_by.map(str::to_string),
                })?;

        self.visiting.push(id.to_string());
        let mut task = Task::new(
            id,
            construct.kind.clone(),
            construct.options.clone(),
            self.dispatcher.clone(),
        );
        for child in &construct.depends_on {
            let dep = self.build(child, Some(id))?;
            task.add_dependency(dep);
        }
        self.visiting.pop();

        let task = Arc::new(task);
        self.built.insert(id.to_string(), task.clone());
        Ok(task)
    }
}

fn format_cycle_path(stack: &[String]) -> String {
    stack.join(" -> ")
}
