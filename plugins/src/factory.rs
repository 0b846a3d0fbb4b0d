use std::sync::Arc;

use harbor_core::executor::{Dispatcher, ExecutorRegistry};
use harbor_core::package::PackageStore;
use harbor_core::DispatcherFactory;

use crate::builtins::{
    ExecCommand, LocalDependencies, LocalDependencyManager, Noop, PackageSetup, RemoteExecutor,
};

/// Registry with every builtin element registered.
///
/// `LocalDependencyManager` and `RemoteExecutor` share one set of loaded
/// dependencies, so a remote task can only run a package loaded earlier in
/// the same registry's lifetime.
pub fn build_registry(store: Arc<PackageStore>) -> Arc<ExecutorRegistry> {
    let locals = Arc::new(LocalDependencies::default());
    ExecutorRegistry::builder()
        .element(Arc::new(ExecCommand))
        .element(Arc::new(PackageSetup))
        .element(Arc::new(Noop))
        .element(Arc::new(LocalDependencyManager::new(
            store.clone(),
            locals.clone(),
        )))
        .element(Arc::new(RemoteExecutor::new(store, locals)))
        .build()
}

/// [`DispatcherFactory`] backed by [`build_registry`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFactory;

impl DispatcherFactory for BuiltinFactory {
    fn build_dispatcher(&self, store: Arc<PackageStore>) -> Arc<dyn Dispatcher> {
        build_registry(store)
    }
}
