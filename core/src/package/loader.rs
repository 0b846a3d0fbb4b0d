use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::PackageConfig;

/// Turns a package configuration file into its graph description.
///
/// Compiling a scripted configuration source lives behind this seam; the
/// store only sees the resulting [`PackageConfig`].
pub trait PackageLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<PackageConfig, ConfigError>;
}

/// Reads a file that already holds the synthesized JSON graph.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPackageLoader;

impl PackageLoader for JsonPackageLoader {
    fn load(&self, path: &Path) -> Result<PackageConfig, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Walk from `start` towards the filesystem root looking for `file_name`.
///
/// Returns the directory containing it. Gives up after `max_depth` parents.
pub fn find_package_root(
    start: &Path,
    file_name: &str,
    max_depth: usize,
) -> Result<PathBuf, ConfigError> {
    let not_found = || ConfigError::NotFound {
        file_name: file_name.to_string(),
        start: start.to_path_buf(),
    };

    let mut dir = start;
    for _ in 0..=max_depth {
        let candidate = dir.join(file_name);
        match std::fs::metadata(&candidate) {
            Ok(_) => {
                tracing::debug!(root = %dir.display(), "found package root");
                return Ok(dir.to_path_buf());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ConfigError::Read {
                    path: candidate,
                    source,
                })
            }
        }
        dir = dir.parent().ok_or_else(not_found)?;
    }
    Err(not_found())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_config_in_an_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".harborrc.json"), "{}").unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let root = find_package_root(&nested, ".harborrc.json", 100).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn respects_the_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".harborrc.json"), "{}").unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let err = find_package_root(&nested, ".harborrc.json", 2).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(find_package_root(&nested, ".harborrc.json", 3).is_ok());
    }

    #[test]
    fn json_loader_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".harborrc.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonPackageLoader.load(&path).unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
