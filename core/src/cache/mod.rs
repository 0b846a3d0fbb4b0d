//! Hierarchical key/value byte store used for replaying task output.
//!
//! Every task gets its own namespace via [`Cache::sub_cache`] keyed by the task
//! id, so entries such as `info.log` never collide between tasks.

mod fs;
mod memory;

use std::path::Path;
use std::sync::Arc;

use crate::error::CacheError;

pub use fs::FsCache;
pub use memory::MemoryCache;

/// Captured stdout of an `ExecCommand` run.
pub const INFO_LOG_KEY: &str = "info.log";
/// Captured stderr of an `ExecCommand` run.
pub const ERROR_LOG_KEY: &str = "error.log";
/// Synthesized package graph, stored at the root of a package cache.
pub const CONFIG_KEY: &str = "config.json";

pub trait Cache: Send + Sync {
    fn add(&self, key: &str, data: &[u8]) -> Result<(), CacheError>;

    /// `Ok(None)` is a miss; `Err` is an I/O failure reading an existing entry.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Remove every entry and child namespace below this one.
    fn clean(&self) -> Result<(), CacheError>;

    fn sub_cache(&self, name: &str) -> Result<Arc<dyn Cache>, CacheError>;

    /// Backing directory, when the cache is persisted on disk.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Cache that stores nothing and never hits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl NoopCache {
    pub fn shared() -> Arc<dyn Cache> {
        Arc::new(NoopCache)
    }
}

impl Cache for NoopCache {
    fn add(&self, _key: &str, _data: &[u8]) -> Result<(), CacheError> {
        Ok(())
    }

    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    fn clean(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn sub_cache(&self, _name: &str) -> Result<Arc<dyn Cache>, CacheError> {
        Ok(NoopCache::shared())
    }
}

/// Reject keys that would escape the namespace they are written into.
pub(crate) fn validate_key(key: &str) -> Result<(), CacheError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.starts_with('\\')
        || key
            .split(['/', '\\'])
            .any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
