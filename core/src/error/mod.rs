#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;

pub use error::{CacheError, CliError, ConfigError};
pub use executor::ExecutorError;
