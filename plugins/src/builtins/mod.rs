//! Builtin execution elements.

mod exec_command;
mod local_dependency;
mod noop;
mod remote_task;

pub use exec_command::{ExecCommand, ExecOptions, EXEC_COMMAND_KIND};
pub use local_dependency::{
    LocalDependencies, LocalDependency, LocalDependencyManager, LocalDependencyOptions,
    LOCAL_DEPENDENCY_KIND,
};
pub use noop::{Noop, PackageSetup, PACKAGE_SETUP_KIND};
pub use remote_task::{RemoteExecutor, RemoteTaskOptions, REMOTE_TASK_KIND};
