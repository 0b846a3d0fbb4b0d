use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "harbor", version, about = "Run tasks of a harbor package")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the package configuration file. Searched upwards from the
    /// current directory when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run every task against a cache that never hits and never stores.
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Ignore cached output and re-run commands, overwriting their logs.
    #[arg(long, global = true)]
    pub force_clean: bool,

    /// Log level filter, e.g. "debug" or "harbor_core=trace".
    #[arg(short = 'v', long, global = true)]
    pub log_level: Option<String>,

    /// Emit JSON logs.
    #[arg(short = 'm', long, global = true)]
    pub machine_readable: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a task of the package, running setup first if it never ran.
    Run(RunArgs),
    /// Run the package setup.
    Setup(SetupArgs),
    /// Inspect or clean the harbor cache.
    #[command(subcommand)]
    Cache(CacheCommands),
    /// Print information on the package.
    Info(InfoArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Task name as declared in the package.
    pub task: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SetupArgs {
    /// Run setup even if it already ran.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheCommands {
    /// Clean the cache of the current package.
    Clean(CleanArgs),
    /// Print the package hash and cache location.
    Info,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CleanArgs {
    /// Remove the whole cache directory, every package hash included.
    #[arg(short, long, conflicts_with = "old")]
    pub all: bool,

    /// Remove cached package hashes other than the current one.
    #[arg(short, long)]
    pub old: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct InfoArgs {
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_global_flags() {
        let args = Args::try_parse_from(["harbor", "run", "build", "--no-cache", "-v", "debug"])
            .unwrap();
        assert!(args.no_cache);
        assert!(!args.force_clean);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(matches!(args.command, Commands::Run(RunArgs { ref task }) if task == "build"));
    }

    #[test]
    fn parses_cache_clean_flags() {
        let args = Args::try_parse_from(["harbor", "cache", "clean", "--old"]).unwrap();
        match args.command {
            Commands::Cache(CacheCommands::Clean(clean)) => {
                assert!(clean.old);
                assert!(!clean.all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Args::try_parse_from(["harbor", "cache", "clean", "--all", "--old"]).is_err());
    }

    #[test]
    fn info_defaults_to_text() {
        let args = Args::try_parse_from(["harbor", "info"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Info(InfoArgs {
                output: OutputFormat::Text
            })
        ));
        let args = Args::try_parse_from(["harbor", "info", "-o", "json"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Info(InfoArgs {
                output: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn setup_force_flag() {
        let args =
            Args::try_parse_from(["harbor", "--config", "/pkg/.harborrc.json", "setup", "-f"])
                .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/pkg/.harborrc.json")));
        assert!(matches!(args.command, Commands::Setup(SetupArgs { force: true })));
    }
}
