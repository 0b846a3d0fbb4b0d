use async_trait::async_trait;

use harbor_core::error::ExecutorError;
use harbor_core::executor::{ExecutionElement, ExecutionRequest, ExecutionResponse, NOOP_KIND};

pub const PACKAGE_SETUP_KIND: &str = "harbor.dev/PackageSetup";

/// Aggregation-only node: succeeds without touching the cache.
#[derive(Debug, Default)]
pub struct Noop;

#[async_trait]
impl ExecutionElement for Noop {
    fn kinds(&self) -> &[&'static str] {
        &[NOOP_KIND]
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, ExecutorError> {
        tracing::trace!(task_id = %request.task.id, "noop executed");
        Ok(ExecutionResponse::default())
    }
}

/// Package setup hook. Currently only logs what it was asked to do.
#[derive(Debug, Default)]
pub struct PackageSetup;

#[async_trait]
impl ExecutionElement for PackageSetup {
    fn kinds(&self) -> &[&'static str] {
        &[PACKAGE_SETUP_KIND]
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, ExecutorError> {
        tracing::debug!(
            task_id = %request.task.id,
            options = %request.options,
            "package setup"
        );
        Ok(ExecutionResponse::default())
    }
}
