//! Command flows: locate and load the package, then run the requested command.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use harbor_core::config::AppConfig;
use harbor_core::error::CliError;
use harbor_core::executor::{ExecutionContext, ExecutionTree};
use harbor_core::package::{find_package_root, JsonPackageLoader};
use harbor_core::{AppContext, RunFlags};
use harbor_plugins::BuiltinFactory;

use crate::commands::cli::{Args, CleanArgs, OutputFormat};

/// Resolve the package configuration file and load it.
pub fn load_context(args: &Args, cfg: AppConfig) -> Result<AppContext, CliError> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir()?;
            let root = find_package_root(
                &cwd,
                &cfg.package.file_name,
                cfg.package.max_search_depth,
            )?;
            root.join(&cfg.package.file_name)
        }
    };
    let flags = RunFlags {
        no_cache: args.no_cache,
        force_clean: args.force_clean,
    };
    Ok(AppContext::new(
        cfg,
        flags,
        &config_path,
        Arc::new(JsonPackageLoader),
        &BuiltinFactory,
    )?)
}

#[tracing::instrument(name = "cli.run", skip(ctx))]
pub async fn run_task(ctx: &AppContext, task: &str) -> Result<i32, CliError> {
    let tree = ctx.build_tree()?;
    let exec = ctx.execution_context();
    ensure_setup(ctx, &tree, &exec, false).await?;
    tree.run_task(&exec, task).await?;
    tracing::info!(task, "task finished");
    Ok(0)
}

#[tracing::instrument(name = "cli.setup", skip(ctx))]
pub async fn run_setup(ctx: &AppContext, force: bool) -> Result<i32, CliError> {
    let tree = ctx.build_tree()?;
    let exec = ctx.execution_context();
    if !ensure_setup(ctx, &tree, &exec, force).await? {
        tracing::warn!("setup already ran, use --force to run it again");
    }
    Ok(0)
}

/// Run setup when it never ran (or `force`), then persist that it did.
/// Returns whether setup ran.
async fn ensure_setup(
    ctx: &AppContext,
    tree: &ExecutionTree,
    exec: &ExecutionContext,
    force: bool,
) -> Result<bool, CliError> {
    let package = ctx.package();
    if package.was_setup_run() && !force {
        return Ok(false);
    }
    tracing::debug!("setup was never run, running setup now");
    println!("setting up package");
    tree.run_setup(exec).await?;
    package.mark_setup_run();
    package.save()?;
    Ok(true)
}

pub fn cache_clean(ctx: &AppContext, args: &CleanArgs) -> Result<i32, CliError> {
    let cache_root = ctx.store().cache_root();
    tracing::info!(cache_root = %cache_root.display(), "cleaning the cache");

    if args.all {
        remove_dir_if_exists(cache_root)?;
        return Ok(0);
    }

    if args.old {
        let removed = remove_old_hashes(cache_root, ctx.package().hash())?;
        tracing::info!(removed = removed.len(), "removed old cache entries");
        return Ok(0);
    }

    ctx.package().cache().clean()?;
    Ok(0)
}

/// Remove every package cache under `cache_root` except `current`.
pub fn remove_old_hashes(cache_root: &Path, current: &str) -> Result<Vec<PathBuf>, CliError> {
    let entries = match std::fs::read_dir(cache_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_name() == current {
            tracing::debug!("skipping current cache directory");
            continue;
        }
        let path = entry.path();
        tracing::debug!(path = %path.display(), "deleting cache element");
        if entry.file_type()?.is_dir() {
            remove_dir_if_exists(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
        removed.push(path);
    }
    Ok(removed)
}

fn remove_dir_if_exists(path: &Path) -> Result<(), CliError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn cache_info(ctx: &AppContext) -> Result<i32, CliError> {
    let package = ctx.package();
    println!("Base cache hash: {}", package.hash());
    println!("Cache location: {}", package.cache_dir().display());
    Ok(0)
}

/// What `harbor info` reports.
#[derive(Debug, Serialize)]
pub struct PackageReport {
    pub name: String,
    pub version: String,
    pub description: String,
    pub stability: String,
    pub repository: String,
    pub homepage: String,
    pub license: String,
    pub hash: String,
    pub cache_dir: PathBuf,
    pub was_setup_run: bool,
    pub tasks: BTreeMap<String, String>,
    pub setup: Vec<String>,
}

impl PackageReport {
    pub fn from_context(ctx: &AppContext) -> Self {
        let package = ctx.package();
        let config = package.config();
        let info = &config.package_info;
        Self {
            name: info.name.clone(),
            version: info.version.clone(),
            description: info.description.clone(),
            stability: info.stability.clone(),
            repository: info.repository.clone(),
            homepage: info.homepage.clone(),
            license: info.license.clone(),
            hash: package.hash().to_string(),
            cache_dir: package.cache_dir().to_path_buf(),
            was_setup_run: package.was_setup_run(),
            tasks: config.tasks.clone(),
            setup: config.setup.clone(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{} {}\n", self.name, self.version));
        if !self.description.is_empty() {
            out.push_str(&format!("{}\n", self.description));
        }
        for (label, value) in [
            ("Stability", &self.stability),
            ("Repository", &self.repository),
            ("Homepage", &self.homepage),
            ("License", &self.license),
        ] {
            if !value.is_empty() {
                out.push_str(&format!("{label}: {value}\n"));
            }
        }
        out.push_str(&format!("Cache: {} ({})\n", self.hash, self.cache_dir.display()));
        out.push_str(&format!("Setup run: {}\n", self.was_setup_run));
        out.push_str("Tasks:\n");
        for (name, id) in &self.tasks {
            out.push_str(&format!("  {name} -> {id}\n"));
        }
        if !self.setup.is_empty() {
            out.push_str("Setup:\n");
            for id in &self.setup {
                out.push_str(&format!("  {id}\n"));
            }
        }
        out
    }
}

pub fn info(ctx: &AppContext, output: OutputFormat) -> Result<i32, CliError> {
    let report = PackageReport::from_context(ctx);
    match output {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| CliError::Command(format!("failed to render info: {e}")))?;
            println!("{json}");
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn package(dir: &Path) -> PathBuf {
        let path = dir.join(".harborrc.json");
        std::fs::write(
            &path,
            r#"{
                "constructs": {
                    "demo/prepare": { "kind": "harbor.dev/PackageSetup" },
                    "demo/lint": { "kind": "harbor.dev/noop", "dependsOn": ["demo/prepare"] }
                },
                "tasks": { "lint": "demo/lint" },
                "setup": ["demo/prepare"],
                "packageInfo": { "name": "demo", "version": "0.1.0", "license": "MIT" }
            }"#,
        )
        .unwrap();
        path
    }

    fn context(path: &Path, extra: &[&str]) -> AppContext {
        let mut argv = vec!["harbor", "--config", path.to_str().unwrap()];
        argv.extend_from_slice(extra);
        let args = Args::try_parse_from(argv).unwrap();
        load_context(&args, AppConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn run_marks_setup_as_done() {
        let dir = tempfile::tempdir().unwrap();
        let path = package(dir.path());

        let ctx = context(&path, &["run", "lint"]);
        assert!(!ctx.package().was_setup_run());
        assert_eq!(run_task(&ctx, "lint").await.unwrap(), 0);
        assert!(ctx.package().was_setup_run());

        let reloaded = context(&path, &["info"]);
        assert!(reloaded.package().was_setup_run());
    }

    #[tokio::test]
    async fn unknown_task_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&package(dir.path()), &["run", "nope"]);
        let err = run_task(&ctx, "nope").await.unwrap_err();
        assert!(matches!(err, CliError::Task(_)));
    }

    #[test]
    fn old_hashes_are_removed_except_current() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&package(dir.path()), &["cache", "clean", "--old"]);
        let cache_root = ctx.store().cache_root().to_path_buf();
        std::fs::create_dir_all(cache_root.join("stale-hash/demo")).unwrap();

        let removed = remove_old_hashes(&cache_root, ctx.package().hash()).unwrap();
        assert_eq!(removed, vec![cache_root.join("stale-hash")]);
        assert!(ctx.package().cache_dir().join("config.json").is_file());
    }

    #[test]
    fn clean_all_removes_the_cache_root() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&package(dir.path()), &["cache", "clean", "--all"]);
        let args = CleanArgs {
            all: true,
            old: false,
        };
        cache_clean(&ctx, &args).unwrap();
        assert!(!ctx.store().cache_root().exists());
    }

    #[test]
    fn report_lists_tasks_and_setup() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&package(dir.path()), &["info"]);
        let report = PackageReport::from_context(&ctx);
        let text = report.render_text();
        assert!(text.starts_with("demo 0.1.0\n"));
        assert!(text.contains("License: MIT\n"));
        assert!(text.contains("  lint -> demo/lint\n"));
        assert!(text.contains("Setup:\n  demo/prepare\n"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tasks"]["lint"], "demo/lint");
    }
}
