use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cache::Cache;
use crate::error::ExecutorError;

use super::context::{TaskContext, TaskIdentity};
use super::task::Dispatcher;

/// Everything an element needs to run one task.
#[derive(Clone)]
pub struct ExecutionRequest {
    pub kind: String,
    pub with_cache: bool,
    pub force_clean: bool,
    /// Namespace of the invoking task.
    pub cache: Arc<dyn Cache>,
    pub working_dir: PathBuf,
    pub workspace_root: Option<PathBuf>,
    pub options: Value,
    pub task: TaskIdentity,
    /// Cooperative cancellation; long running elements should observe it.
    pub cancel: CancellationToken,
    /// Dispatcher the invoking task was built with.
    pub dispatcher: Arc<dyn Dispatcher>,
}

impl ExecutionRequest {
    pub fn from_task(ctx: &TaskContext, kind: &str, options: &Value) -> Self {
        Self {
            kind: kind.to_string(),
            with_cache: ctx.exec.cache_enabled(),
            force_clean: ctx.exec.force_clean(),
            cache: ctx.cache.clone(),
            working_dir: ctx.exec.working_dir().to_path_buf(),
            workspace_root: ctx.exec.workspace_root().map(|p| p.to_path_buf()),
            options: options.clone(),
            task: ctx.task.clone(),
            cancel: ctx.exec.cancel_token().clone(),
            dispatcher: ctx.dispatcher.clone(),
        }
    }

    /// Deserialize the opaque options payload into an element's option type.
    pub fn decode_options<T: serde::de::DeserializeOwned>(&self) -> Result<T, ExecutorError> {
        let options = match &self.options {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(options).map_err(|e| ExecutorError::InvalidOptions {
            kind: self.kind.clone(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub location: String,
}

#[derive(Debug, Default)]
pub struct ExecutionResponse {
    pub was_cached: bool,
    pub artifacts: Vec<Artifact>,
    pub error: Option<ExecutorError>,
}

impl ExecutionResponse {
    pub fn cached() -> Self {
        Self {
            was_cached: true,
            ..Self::default()
        }
    }
}

/// A pluggable handler for one or more kinds.
#[async_trait]
pub trait ExecutionElement: Send + Sync {
    /// Kinds this element registers itself under.
    fn kinds(&self) -> &[&'static str];

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, ExecutorError>;
}

/// Maps kinds to elements and dispatches tasks to them.
#[derive(Default)]
pub struct ExecutorRegistry {
    elements: HashMap<String, Arc<dyn ExecutionElement>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Register `element` for `kind`. A later registration for the same kind
    /// replaces the earlier one.
    pub fn register(&mut self, kind: impl Into<String>, element: Arc<dyn ExecutionElement>) {
        let kind = kind.into();
        if self.elements.insert(kind.clone(), element).is_some() {
            tracing::debug!(kind = %kind, "replacing registered executor");
        }
    }

    /// Register `element` under every kind it declares.
    pub fn accept(&mut self, element: Arc<dyn ExecutionElement>) {
        for kind in element.kinds() {
            self.register(*kind, element.clone());
        }
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ExecutionElement>> {
        self.elements.get(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub async fn execute(
        &self,
        ctx: &TaskContext,
        kind: &str,
        options: &Value,
    ) -> Result<(), ExecutorError> {
        tracing::trace!(kind, task_id = %ctx.task.id, "running an executor");
        let element = self
            .elements
            .get(kind)
            .ok_or_else(|| ExecutorError::ExecutorNotFound(kind.to_string()))?;

        let response = element
            .execute(ExecutionRequest::from_task(ctx, kind, options))
            .await?;
        if let Some(err) = response.error {
            return Err(err);
        }
        if response.was_cached {
            tracing::debug!(task_id = %ctx.task.id, "replayed from cache");
        }
        if !response.artifacts.is_empty() {
            self.relocate_artifacts(&ctx.task, &response.artifacts);
        }
        Ok(())
    }

    /// Hook for moving produced artifacts into the package's artifact store.
    /// Artifacts are currently left where the element put them.
    fn relocate_artifacts(&self, task: &TaskIdentity, artifacts: &[Artifact]) {
        for artifact in artifacts {
            tracing::debug!(
                task_id = %task.id,
                artifact = %artifact.name,
                location = %artifact.location,
                "artifact left in place"
            );
        }
    }
}

#[async_trait]
impl Dispatcher for ExecutorRegistry {
    async fn dispatch(&self, ctx: &TaskContext, options: &Value) -> Result<(), ExecutorError> {
        self.execute(ctx, &ctx.task.kind, options).await
    }
}

/// Explicit registration list, consumed once into an [`ExecutorRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    registry: ExecutorRegistry,
}

impl RegistryBuilder {
    pub fn element(mut self, element: Arc<dyn ExecutionElement>) -> Self {
        self.registry.accept(element);
        self
    }

    pub fn kind(mut self, kind: impl Into<String>, element: Arc<dyn ExecutionElement>) -> Self {
        self.registry.register(kind, element);
        self
    }

    pub fn build(self) -> Arc<ExecutorRegistry> {
        Arc::new(self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoopCache;
    use crate::executor::ExecutionContext;
    use std::sync::Mutex;

    struct Named {
        name: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl Named {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ExecutionElement for Named {
        fn kinds(&self) -> &[&'static str] {
            &["test.dev/a", "test.dev/b"]
        }

        async fn execute(
            &self,
            request: ExecutionRequest,
        ) -> Result<ExecutionResponse, ExecutorError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}:{}", self.name, request.kind, request.task.id));
            if request.options.get("fail").is_some() {
                return Ok(ExecutionResponse {
                    error: Some(ExecutorError::Unsupported("asked to fail".into())),
                    ..ExecutionResponse::default()
                });
            }
            Ok(ExecutionResponse::default())
        }
    }

    fn task_ctx(registry: &Arc<ExecutorRegistry>, kind: &str) -> TaskContext {
        TaskContext {
            exec: ExecutionContext::new(NoopCache::shared(), "/work"),
            task: TaskIdentity {
                id: "pkg/t".into(),
                kind: kind.into(),
            },
            cache: NoopCache::shared(),
            dispatcher: registry.clone(),
        }
    }

    #[tokio::test]
    async fn dispatches_by_kind() {
        let first = Named::new("first");
        let registry = ExecutorRegistry::builder().element(first.clone()).build();
        assert_eq!(registry.kinds(), vec!["test.dev/a", "test.dev/b"]);

        let ctx = task_ctx(&registry, "test.dev/b");
        registry.dispatch(&ctx, &Value::Null).await.unwrap();
        assert_eq!(*first.seen.lock().unwrap(), vec!["first:test.dev/b:pkg/t"]);
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let first = Named::new("first");
        let second = Named::new("second");
        let registry = ExecutorRegistry::builder()
            .element(first.clone())
            .kind("test.dev/a", second.clone())
            .build();

        let ctx = task_ctx(&registry, "test.dev/a");
        registry.dispatch(&ctx, &Value::Null).await.unwrap();
        assert!(first.seen.lock().unwrap().is_empty());
        assert_eq!(second.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_kind_is_executor_not_found() {
        let registry = ExecutorRegistry::builder().build();
        let ctx = task_ctx(&registry, "nope");
        let err = registry.dispatch(&ctx, &Value::Null).await.unwrap_err();
        assert!(matches!(err, ExecutorError::ExecutorNotFound(kind) if kind == "nope"));
    }

    #[tokio::test]
    async fn response_error_is_a_failure() {
        let registry = ExecutorRegistry::builder()
            .element(Named::new("first"))
            .build();
        let ctx = task_ctx(&registry, "test.dev/a");
        let err = registry
            .dispatch(&ctx, &serde_json::json!({ "fail": true }))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Unsupported(_)));
    }

    #[test]
    fn null_options_decode_as_empty_object() {
        #[derive(serde::Deserialize)]
        struct Opts {
            #[serde(default)]
            path: String,
        }
        let registry = ExecutorRegistry::builder().build();
        let ctx = task_ctx(&registry, "k");
        let request = ExecutionRequest::from_task(&ctx, "k", &Value::Null);
        let opts: Opts = request.decode_options().unwrap();
        assert!(opts.path.is_empty());
    }
}
