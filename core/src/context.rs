use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::{ConfigError, ExecutorError};
use crate::executor::{Dispatcher, ExecutionContext, ExecutionTree};
use crate::package::{LoadedPackage, PackageLoader, PackageStore};

/// Builds the dispatcher a run uses. Implemented by the plugin crate so the
/// core never depends on concrete elements.
pub trait DispatcherFactory: Send + Sync {
    fn build_dispatcher(&self, store: Arc<PackageStore>) -> Arc<dyn Dispatcher>;
}

/// Per-invocation switches layered over [`AppConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    pub no_cache: bool,
    pub force_clean: bool,
}

/// Everything a command needs to run against one package.
#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    flags: RunFlags,
    store: Arc<PackageStore>,
    package: Arc<LoadedPackage>,
    dispatcher: Arc<dyn Dispatcher>,
    cancel: CancellationToken,
}

impl AppContext {
    /// Load the package whose configuration file is `config_path`.
    pub fn new(
        cfg: AppConfig,
        flags: RunFlags,
        config_path: &Path,
        loader: Arc<dyn PackageLoader>,
        factory: &dyn DispatcherFactory,
    ) -> Result<Self, ConfigError> {
        let root = config_path.parent().unwrap_or_else(|| Path::new("."));
        let cache_root = resolve_cache_root(root, &cfg.cache.directory);
        let store = Arc::new(
            PackageStore::new(loader, cache_root).with_file_name(cfg.package.file_name.clone()),
        );
        let package = store.load(config_path)?;
        let dispatcher = factory.build_dispatcher(store.clone());

        tracing::debug!(
            package = %package.config().package_info.name,
            hash = %package.hash(),
            "package loaded"
        );
        Ok(Self {
            cfg,
            flags,
            store,
            package,
            dispatcher,
            cancel: CancellationToken::new(),
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn flags(&self) -> RunFlags {
        self.flags
    }

    pub fn store(&self) -> &Arc<PackageStore> {
        &self.store
    }

    pub fn package(&self) -> &Arc<LoadedPackage> {
        &self.package
    }

    /// Root token of the run; cancelling it asks every running task to stop.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cache_enabled(&self) -> bool {
        self.cfg.cache.enabled && !self.flags.no_cache
    }

    pub fn execution_context(&self) -> ExecutionContext {
        self.package
            .execution_context()
            .with_cache(self.cache_enabled())
            .with_force_clean(self.flags.force_clean)
            .with_workspace_root(Some(self.package.working_dir().to_path_buf()))
            .with_cancel_token(self.cancel.clone())
    }

    pub fn build_tree(&self) -> Result<ExecutionTree, ExecutorError> {
        ExecutionTree::from_config(self.package.config(), self.dispatcher.clone())
    }
}

/// `directory` relative to the package root unless absolute.
pub fn resolve_cache_root(package_root: &Path, directory: &str) -> PathBuf {
    let dir = Path::new(directory);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        package_root.join(dir)
    }
}
