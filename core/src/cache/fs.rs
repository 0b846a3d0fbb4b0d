use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CacheError;

use super::{validate_key, Cache};

/// Directory-backed cache. Each namespace is a directory, each key a file.
#[derive(Debug, Clone)]
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| CacheError::CreateDir {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Cache for FsCache {
    fn add(&self, key: &str, data: &[u8]) -> Result<(), CacheError> {
        validate_key(key)?;
        let path = self.root.join(key);
        tracing::debug!(cache_file = %path.display(), bytes = data.len(), "writing to cache file");
        std::fs::write(&path, data).map_err(|source| CacheError::Write {
            key: key.to_string(),
            source,
        })
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        validate_key(key)?;
        let path = self.root.join(key);
        match std::fs::read(&path) {
            Ok(data) => {
                tracing::debug!(cache_file = %path.display(), bytes = data.len(), "cache hit");
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(cache_file = %path.display(), "cache file not found");
                Ok(None)
            }
            Err(source) => Err(CacheError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn clean(&self) -> Result<(), CacheError> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CacheError::Clean {
                    path: self.root.clone(),
                    source,
                })
            }
        }
        std::fs::create_dir_all(&self.root).map_err(|source| CacheError::CreateDir {
            path: self.root.clone(),
            source,
        })
    }

    fn sub_cache(&self, name: &str) -> Result<Arc<dyn Cache>, CacheError> {
        validate_key(name)?;
        Ok(Arc::new(FsCache::new(self.root.join(name))?))
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ERROR_LOG_KEY, INFO_LOG_KEY};

    #[test]
    fn add_then_get_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path().join("abc")).unwrap();

        assert!(cache.get(INFO_LOG_KEY).unwrap().is_none());
        cache.add(INFO_LOG_KEY, b"built ok\n").unwrap();
        assert_eq!(cache.get(INFO_LOG_KEY).unwrap().unwrap(), b"built ok\n");
        assert!(dir.path().join("abc").join(INFO_LOG_KEY).is_file());
    }

    #[test]
    fn add_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path()).unwrap();
        cache.add(ERROR_LOG_KEY, b"a much longer first value").unwrap();
        cache.add(ERROR_LOG_KEY, b"short").unwrap();
        assert_eq!(cache.get(ERROR_LOG_KEY).unwrap().unwrap(), b"short");
    }

    #[test]
    fn sub_caches_mirror_task_ids() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path()).unwrap();
        let build = cache.sub_cache("pkg/build").unwrap();
        let lint = cache.sub_cache("pkg/lint").unwrap();

        build.add(INFO_LOG_KEY, b"build").unwrap();
        assert!(lint.get(INFO_LOG_KEY).unwrap().is_none());
        assert_eq!(
            build.location().unwrap(),
            dir.path().join("pkg").join("build").as_path()
        );
    }

    #[test]
    fn clean_removes_children_and_recreates_root() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path().join("root")).unwrap();
        cache
            .sub_cache("pkg/test")
            .unwrap()
            .add(INFO_LOG_KEY, b"x")
            .unwrap();

        cache.clean().unwrap();

        assert!(dir.path().join("root").is_dir());
        assert!(!dir.path().join("root").join("pkg").exists());
    }

    #[test]
    fn root_that_cannot_be_created_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"not a dir").unwrap();

        let err = FsCache::new(file.join("cache")).unwrap_err();
        assert!(matches!(err, CacheError::CreateDir { .. }));
    }
}
