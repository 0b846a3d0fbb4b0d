use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Deserialize;

use harbor_core::error::ExecutorError;
use harbor_core::executor::{
    ExecutionElement, ExecutionRequest, ExecutionResponse, ExecutionTree,
};
use harbor_core::package::{LoadedPackage, PackageStore};

pub const LOCAL_DEPENDENCY_KIND: &str = "harbor.dev/LocalDependency";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocalDependencyOptions {
    /// Package directory, relative to the depending package.
    pub path: String,
}

/// A nested package whose graph is ready to run.
pub struct LocalDependency {
    pub package: Arc<LoadedPackage>,
    pub tree: Arc<ExecutionTree>,
}

/// Loaded nested packages keyed by their resolved configuration path.
///
/// Shared by every graph built from one registry, so two packages declaring
/// the same relative path still map to distinct entries.
#[derive(Default)]
pub struct LocalDependencies {
    loaded: Mutex<HashMap<PathBuf, Arc<LocalDependency>>>,
}

impl LocalDependencies {
    pub fn get(&self, config_path: &Path) -> Option<Arc<LocalDependency>> {
        self.lock().get(config_path).cloned()
    }

    fn insert(&self, config_path: PathBuf, dep: Arc<LocalDependency>) {
        self.lock().insert(config_path, dep);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<LocalDependency>>> {
        self.loaded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Loads a nested package and builds its graph for later `RemoteTask` runs.
pub struct LocalDependencyManager {
    store: Arc<PackageStore>,
    locals: Arc<LocalDependencies>,
}

impl LocalDependencyManager {
    pub fn new(store: Arc<PackageStore>, locals: Arc<LocalDependencies>) -> Self {
        Self { store, locals }
    }
}

#[async_trait]
impl ExecutionElement for LocalDependencyManager {
    fn kinds(&self) -> &[&'static str] {
        &[LOCAL_DEPENDENCY_KIND]
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, ExecutorError> {
        let opts: LocalDependencyOptions = request.decode_options()?;
        let config_path = resolve_config_path(&self.store, &request, &opts.path);
        tracing::debug!(
            task_id = %request.task.id,
            location = %config_path.display(),
            "attempting to load config"
        );

        let package = self.store.load(&config_path)?;
        let tree = ExecutionTree::from_config(package.config(), request.dispatcher.clone())?;
        self.locals.insert(
            config_path,
            Arc::new(LocalDependency {
                package,
                tree: Arc::new(tree),
            }),
        );
        Ok(ExecutionResponse::default())
    }
}

/// Configuration file of the dependency at `path`, relative to the requesting
/// package.
pub(crate) fn resolve_config_path(
    store: &PackageStore,
    request: &ExecutionRequest,
    path: &str,
) -> PathBuf {
    store.config_path_in(&request.working_dir.join(path))
}
