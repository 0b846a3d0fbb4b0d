use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default harbor data directory: ~/.harbor
pub fn get_harbor_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".harbor"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.harbor/config.toml (highest)
    let harbor_config = get_harbor_data_dir()?.join("config.toml");

    // Priority 2: ./harbor.toml (current directory)
    let local_config = Path::new("harbor.toml");

    let mut cfg = if harbor_config.exists() {
        load_from_path(&harbor_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)?;
    tracing::debug!(path = %path.display(), "loaded app config");
    Ok(cfg)
}

/// Environment variable overrides (Priority 0: highest).
///
/// `lookup` is injected so tests do not have to mutate the process environment.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("HARBOR_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = non_empty("HARBOR_CACHE_DIR") {
        cfg.cache.directory = v;
    }
    if let Some(v) = non_empty("HARBOR_NO_CACHE") {
        if v != "0" && !v.eq_ignore_ascii_case("false") {
            cfg.cache.enabled = false;
        }
    }
}
