use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

use crate::cache::{Cache, FsCache, CONFIG_KEY};
use crate::error::ConfigError;
use crate::executor::ExecutionContext;

use super::loader::PackageLoader;
use super::types::PackageConfig;

/// A package configuration resolved against its cache.
#[derive(Debug)]
pub struct LoadedPackage {
    config: PackageConfig,
    hash: String,
    path: PathBuf,
    working_dir: PathBuf,
    cache: Arc<FsCache>,
    was_setup_run: AtomicBool,
}

impl LoadedPackage {
    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// SHA-256 (hex) of the configuration source.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the configuration file; commands run from here.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn cache(&self) -> Arc<dyn Cache> {
        self.cache.clone()
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.root()
    }

    pub fn was_setup_run(&self) -> bool {
        self.was_setup_run.load(Ordering::SeqCst)
    }

    pub fn mark_setup_run(&self) {
        self.was_setup_run.store(true, Ordering::SeqCst);
    }

    /// Persist the configuration, including the setup flag, to `config.json`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.was_setup_run = self.was_setup_run();
        let bytes = serde_json::to_vec(&config).map_err(ConfigError::Encode)?;
        self.cache.add(CONFIG_KEY, &bytes)?;
        tracing::debug!(hash = %self.hash, "saved package configuration");
        Ok(())
    }

    /// Context rooted at this package's cache and directory.
    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::new(self.cache(), self.working_dir.clone())
    }
}

/// Owns every package configuration loaded during a run.
///
/// Each package's cache lives at `<cache root>/<hash of its source>/`, so an
/// edited configuration gets a fresh cache while an unchanged one replays.
pub struct PackageStore {
    loader: Arc<dyn PackageLoader>,
    cache_root: PathBuf,
    file_name: String,
    loaded: Mutex<HashMap<PathBuf, Arc<LoadedPackage>>>,
}

impl PackageStore {
    pub fn new(loader: Arc<dyn PackageLoader>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            cache_root: cache_root.into(),
            file_name: ".harborrc.json".to_string(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path of the configuration file of the package rooted at `dir`.
    pub fn config_path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }

    /// Load the package configuration at `path`.
    ///
    /// A cached `config.json` for the same source hash wins over the loader.
    /// Failing to create the package cache is fatal.
    pub fn load(&self, path: &Path) -> Result<Arc<LoadedPackage>, ConfigError> {
        if let Some(pkg) = self.lock().get(path) {
            tracing::debug!(file = %path.display(), "config already loaded into memory");
            return Ok(pkg.clone());
        }

        let source = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let hash = format!("{:x}", Sha256::digest(&source));
        let cache = Arc::new(FsCache::new(self.cache_root.join(&hash))?);

        let config = match cache.get(CONFIG_KEY)? {
            Some(bytes) => {
                tracing::debug!(hash = %hash, "using cached package configuration");
                serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                    path: cache.root().join(CONFIG_KEY),
                    source,
                })?
            }
            None => {
                tracing::debug!(file = %path.display(), "config isn't cached, creating it now");
                let config = self.loader.load(path)?;
                let bytes = serde_json::to_vec(&config).map_err(ConfigError::Encode)?;
                cache.add(CONFIG_KEY, &bytes)?;
                config
            }
        };

        let working_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let pkg = Arc::new(LoadedPackage {
            was_setup_run: AtomicBool::new(config.was_setup_run),
            config,
            hash,
            path: path.to_path_buf(),
            working_dir,
            cache,
        });

        self.lock().insert(path.to_path_buf(), pkg.clone());
        Ok(pkg)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<LoadedPackage>>> {
        self.loaded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::JsonPackageLoader;
    use std::sync::atomic::AtomicUsize;

    const CONFIG: &str = r#"{
        "constructs": { "pkg/lint": { "kind": "harbor.dev/ExecCommand", "options": {} } },
        "tasks": { "lint": "pkg/lint" },
        "setup": []
    }"#;

    struct Counting {
        calls: AtomicUsize,
    }

    impl PackageLoader for Counting {
        fn load(&self, path: &Path) -> Result<PackageConfig, ConfigError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            JsonPackageLoader.load(path)
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn loads_hashes_and_caches_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".harborrc.json");
        std::fs::write(&path, CONFIG).unwrap();
        let cache_root = dir.path().join(".harbor");

        let loader = counting();
        let store = PackageStore::new(loader.clone(), &cache_root);
        let pkg = store.load(&path).unwrap();

        assert_eq!(pkg.hash().len(), 64);
        assert_eq!(pkg.working_dir(), dir.path());
        assert_eq!(pkg.cache_dir(), cache_root.join(pkg.hash()));
        assert!(cache_root.join(pkg.hash()).join("config.json").is_file());
        assert_eq!(pkg.config().tasks["lint"], "pkg/lint");

        let again = store.load(&path).unwrap();
        assert!(Arc::ptr_eq(&pkg, &again));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cached_config_skips_the_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".harborrc.json");
        std::fs::write(&path, CONFIG).unwrap();
        let cache_root = dir.path().join(".harbor");

        PackageStore::new(counting(), &cache_root).load(&path).unwrap();

        let loader = counting();
        let pkg = PackageStore::new(loader.clone(), &cache_root)
            .load(&path)
            .unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pkg.config().tasks["lint"], "pkg/lint");
    }

    #[test]
    fn editing_the_source_changes_the_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".harborrc.json");
        let cache_root = dir.path().join(".harbor");

        std::fs::write(&path, CONFIG).unwrap();
        let first = PackageStore::new(counting(), &cache_root).load(&path).unwrap();
        std::fs::write(&path, "{}").unwrap();
        let second = PackageStore::new(counting(), &cache_root).load(&path).unwrap();

        assert_ne!(first.hash(), second.hash());
        assert!(second.config().tasks.is_empty());
    }

    #[test]
    fn save_persists_the_setup_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".harborrc.json");
        std::fs::write(&path, CONFIG).unwrap();
        let cache_root = dir.path().join(".harbor");

        let pkg = PackageStore::new(counting(), &cache_root).load(&path).unwrap();
        assert!(!pkg.was_setup_run());
        pkg.mark_setup_run();
        pkg.save().unwrap();

        let reloaded = PackageStore::new(counting(), &cache_root).load(&path).unwrap();
        assert!(reloaded.was_setup_run());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackageStore::new(counting(), dir.path().join(".harbor"));
        let err = store.load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
