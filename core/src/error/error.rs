use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use super::executor::ExecutorError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("task failed: {0}")]
    Task(#[from] Arc<ExecutorError>),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<ExecutorError> for CliError {
    fn from(err: ExecutorError) -> Self {
        Self::Task(Arc::new(err))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no configuration file {file_name} found above {}", start.display())]
    NotFound { file_name: String, start: PathBuf },
    #[error("error opening file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode configuration: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("invalid app config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to make cache dir {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read cache entry {key}: {source}")]
    Read {
        key: String,
        source: std::io::Error,
    },
    #[error("failed to write cache entry {key}: {source}")]
    Write {
        key: String,
        source: std::io::Error,
    },
    #[error("failed to clean cache at {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),
}
