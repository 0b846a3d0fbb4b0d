use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::CacheError;

use super::{validate_key, Cache};

/// Process-local cache. Namespaces with the same name share their entries.
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<Node>>,
}

#[derive(Debug, Default)]
struct Node {
    entries: HashMap<String, Vec<u8>>,
    children: HashMap<String, MemoryCache>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Node> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of entries stored directly in this namespace.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed variant of [`Cache::sub_cache`] for callers that need to inspect
    /// a child namespace directly.
    pub fn child(&self, name: &str) -> MemoryCache {
        self.lock()
            .children
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}

impl Cache for MemoryCache {
    fn add(&self, key: &str, data: &[u8]) -> Result<(), CacheError> {
        validate_key(key)?;
        self.lock().entries.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        validate_key(key)?;
        Ok(self.lock().entries.get(key).cloned())
    }

    fn clean(&self) -> Result<(), CacheError> {
        let mut node = self.lock();
        node.entries.clear();
        node.children.clear();
        Ok(())
    }

    fn sub_cache(&self, name: &str) -> Result<Arc<dyn Cache>, CacheError> {
        validate_key(name)?;
        Ok(Arc::new(self.child(name)))
    }
}
