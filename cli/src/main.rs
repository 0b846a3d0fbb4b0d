use clap::Parser;
use harbor_cli::app;
use harbor_cli::commands::cli;
use harbor_core::config::LoggingConfig;
use harbor_core::error::{self, ConfigError};
use harbor_core::AppContext;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();
    let mut cfg = harbor_core::config::load_default()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    if let Some(level) = &args.log_level {
        cfg.logging.level = level.clone();
    }
    init_tracing(&cfg.logging, args.machine_readable).map_err(error::CliError::Command)?;

    let ctx = app::load_context(&args, cfg)?;
    watch_ctrl_c(&ctx);
    dispatch(args.command, &ctx).await
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 1: task failure
    // 11: config error
    // 20: IO / cache error
    // 50: internal/uncategorized
    match e {
        error::CliError::Task(_) => 1,
        error::CliError::Config(_) => 11,
        error::CliError::Cache(_) => 20,
        error::CliError::Io(_) => 20,
        error::CliError::Command(_) => 20,
        error::CliError::Anyhow(_) => 50,
    }
}

/// Cancel the run on Ctrl-C; running commands are killed, the rest unwinds.
fn watch_ctrl_c(ctx: &AppContext) {
    let cancel = ctx.cancel_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling running tasks");
            cancel.cancel();
        }
    });
}

async fn dispatch(cmd: cli::Commands, ctx: &AppContext) -> Result<i32, error::CliError> {
    match cmd {
        cli::Commands::Run(run_args) => app::run_task(ctx, &run_args.task).await,
        cli::Commands::Setup(setup_args) => app::run_setup(ctx, setup_args.force).await,
        cli::Commands::Cache(cli::CacheCommands::Clean(clean_args)) => {
            app::cache_clean(ctx, &clean_args)
        }
        cli::Commands::Cache(cli::CacheCommands::Info) => app::cache_info(ctx),
        cli::Commands::Info(info_args) => app::info(ctx, info_args.output),
    }
}

fn init_tracing(logging: &LoggingConfig, machine_readable: bool) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("harbor"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("harbor.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        if machine_readable {
            layer.json().boxed()
        } else {
            layer.with_ansi(atty::is(atty::Stream::Stderr)).boxed()
        }
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
