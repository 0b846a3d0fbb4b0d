//! Dependency graph execution.
//!
//! ```text
//! PackageConfig
//!   ↓
//! ExecutionTree::from_config()  → one Task per construct, cycles rejected
//!   ↓
//! Task::execute()               → dependencies fan out concurrently, then dispatch
//!   ↓
//! ExecutorRegistry              → kind → ExecutionElement
//! ```

mod context;
mod graph;
mod registry;
mod scheduler;
mod task;

pub use context::{ExecutionContext, TaskContext, TaskIdentity};
pub use graph::{ExecutionTree, NOOP_KIND, SETUP_TASK_ID};
pub use registry::{
    Artifact, ExecutionElement, ExecutionRequest, ExecutionResponse, ExecutorRegistry,
    RegistryBuilder,
};
pub use scheduler::execute_dependencies;
pub use task::{Dispatcher, Task, TaskOutcome};
