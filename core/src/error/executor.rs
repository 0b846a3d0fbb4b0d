use std::sync::Arc;

use thiserror::Error;

use super::error::{CacheError, ConfigError};

/// Errors raised while building or executing a task graph.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("failed to find construct of id {id}{}", required_by_suffix(.required_by))]
    ConstructNotFound {
        id: String,
        required_by: Option<String>,
    },

    #[error("Circular dependency detected: {0}")]
    CycleDetected(String),

    #[error("no executor for kind {0}")]
    ExecutorNotFound(String),

    #[error("task {task_id} failed to execute children: {}", join_failures(.failures))]
    DependencyFailure {
        task_id: String,
        failures: Vec<Arc<ExecutorError>>,
    },

    #[error("task {task_id} failed to execute: {source}")]
    TaskFailed {
        task_id: String,
        #[source]
        source: Box<ExecutorError>,
    },

    #[error("failed to execute command {executable}: {message}")]
    Process { executable: String, message: String },

    #[error("{task_id} was canceled")]
    Cancelled { task_id: String },

    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },

    #[error("failed to run task {task} of dependency {dependency}: {source}")]
    Remote {
        dependency: String,
        task: String,
        #[source]
        source: Arc<ExecutorError>,
    },

    #[error("cache error: {0}")]
    CacheIo(#[from] CacheError),

    #[error("did not load local dependency at {0}")]
    DependencyNotLoaded(String),

    #[error("can not find task with name {0}")]
    TaskNotFound(String),

    #[error("invalid options for {kind}: {message}")]
    InvalidOptions { kind: String, message: String },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("plugin error: {0}")]
    Plugin(#[from] anyhow::Error),
}

impl ExecutorError {
    /// True when this error, or any failure it wraps, came from cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::TaskFailed { source, .. } => source.is_cancelled(),
            Self::Remote { source, .. } => source.is_cancelled(),
            Self::DependencyFailure { failures, .. } => failures.iter().any(|f| f.is_cancelled()),
            _ => false,
        }
    }

    /// Innermost error, skipping task/dependency wrappers (first failure wins).
    pub fn root_cause(&self) -> &ExecutorError {
        match self {
            Self::TaskFailed { source, .. } => source.root_cause(),
            Self::Remote { source, .. } => source.root_cause(),
            Self::DependencyFailure { failures, .. } => match failures.first() {
                Some(first) => first.root_cause(),
                None => self,
            },
            _ => self,
        }
    }
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(parent) => format!(" (required by {parent})"),
        None => String::new(),
    }
}

fn join_failures(failures: &[Arc<ExecutorError>]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
