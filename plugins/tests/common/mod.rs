#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use harbor_core::cache::{Cache, MemoryCache};
use harbor_core::executor::{ExecutionContext, ExecutionTree};
use harbor_core::package::{JsonPackageLoader, PackageConfig, PackageStore};
use harbor_plugins::build_registry;

/// Write `json` as the package configuration in `dir`, creating it first.
pub fn write_package(dir: &Path, json: serde_json::Value) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(".harborrc.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&json).unwrap()).unwrap();
    path
}

pub fn store(cache_root: &Path) -> Arc<PackageStore> {
    Arc::new(PackageStore::new(Arc::new(JsonPackageLoader), cache_root))
}

/// Tree for `json` wired to the builtin registry, plus a context rooted at an
/// in-memory cache.
pub fn in_memory_tree(
    work: &Path,
    json: serde_json::Value,
) -> (ExecutionTree, ExecutionContext, MemoryCache) {
    let config: PackageConfig = serde_json::from_value(json).unwrap();
    let registry = build_registry(store(&work.join(".harbor")));
    let tree = ExecutionTree::from_config(&config, registry).unwrap();
    let cache = MemoryCache::new();
    let root: Arc<dyn Cache> = Arc::new(cache.clone());
    let ctx = ExecutionContext::new(root, work);
    (tree, ctx, cache)
}

pub fn exec(id: &str, executable: &str, args: &[&str]) -> (String, serde_json::Value) {
    (
        id.to_string(),
        serde_json::json!({
            "kind": "harbor.dev/ExecCommand",
            "options": { "executable": executable, "args": args },
            "dependsOn": []
        }),
    )
}
