use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;

use crate::error::ExecutorError;

use super::context::ExecutionContext;
use super::task::Task;

/// Execute every dependency concurrently and wait for all of them.
///
/// Siblings share one child cancellation token. The first failure cancels it,
/// which only reaches executors that observe the token; the join still waits
/// for every dependency to reach a terminal state.
///
/// # Returns
///
/// The failures, in completion order. Empty means every dependency succeeded.
pub async fn execute_dependencies(
    dependencies: &[Arc<Task>],
    ctx: &ExecutionContext,
) -> Vec<Arc<ExecutorError>> {
    if dependencies.is_empty() {
        return Vec::new();
    }

    let siblings = ctx.child();
    let siblings = &siblings;
    let mut futs: FuturesUnordered<_> = dependencies
        .iter()
        .map(|dep| async move { (dep.id(), dep.execute(siblings).await) })
        .collect();

    let mut failures = Vec::new();
    while let Some((child_id, res)) = futs.next().await {
        if let Err(err) = res {
            tracing::trace!(child_id, error = %err, "child died");
            siblings.cancel_token().cancel();
            failures.push(err);
        }
    }

    if failures.is_empty() {
        tracing::trace!(count = dependencies.len(), "finished executing all children");
    }
    failures
}
