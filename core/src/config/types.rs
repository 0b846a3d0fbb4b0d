use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub package: PackageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "harbor_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false every task runs against a no-op cache (no replay, no writes).
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Root of the persisted cache, relative to the package root unless absolute.
    #[serde(default = "default_cache_directory")]
    pub directory: String,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_directory() -> String {
    ".harbor".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            directory: default_cache_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSettings {
    /// Name of the synthesized graph file searched for in the package root.
    #[serde(default = "default_package_file_name")]
    pub file_name: String,

    /// How many parent directories to climb while looking for `file_name`.
    #[serde(default = "default_max_search_depth")]
    pub max_search_depth: usize,
}

fn default_package_file_name() -> String {
    ".harborrc.json".to_string()
}

fn default_max_search_depth() -> usize {
    100
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            file_name: default_package_file_name(),
            max_search_depth: default_max_search_depth(),
        }
    }
}
