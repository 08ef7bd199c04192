use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use anilike_cli::config::{Config, ConfigSource, LogSection};
use anilike_cli::runner::{self, RunOptions};

static LONG_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}\ncommit: {}\nbuilt: {}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_DATE"),
    )
});

/// AniLike - paced liking for the AniList activity feed
#[derive(Parser)]
#[command(author, version, long_version = LONG_VERSION.as_str(), about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level; `RUST_LOG` and this flag override the config file
    #[arg(short, long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the activity feed and like unseen entries
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Navigate and pace normally but never click; in-memory ledger
    #[arg(long)]
    dry_run: bool,

    /// Stop after this long, e.g. "45m" or "2h"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    max_run_duration: Option<Duration>,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Drive the run from a JSON feed file instead of a live browser
    #[arg(long, value_name = "FILE")]
    feed_fixture: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) = Config::load(cli.config.as_deref())?;
    let guard = init_logging(cli.log_level.as_deref(), &config.log)?;

    info!(target: "cli", version = env!("CARGO_PKG_VERSION"), "anilike starting");
    match &source {
        ConfigSource::File(path) => {
            info!(target: "cli", path = %path.display(), "configuration loaded")
        }
        ConfigSource::Defaults(path) => warn!(
            target: "cli",
            path = %path.display(),
            "config file not found, using defaults"
        ),
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(target: "cli", "interrupt received, finishing up");
            interrupt.cancel();
        }
    });

    let code = match cli.command {
        Commands::Run(args) => {
            let opts = RunOptions {
                dry_run: args.dry_run,
                max_duration: args.max_run_duration,
                headed: args.headed,
                fixture: args
                    .feed_fixture
                    .or_else(|| std::env::var_os(runner::FEED_FIXTURE_ENV).map(PathBuf::from)),
            };
            match runner::execute(&config, &opts, cancel).await {
                Ok(report) => report.exit_code(),
                Err(err) => {
                    error!(target: "cli", "run could not be completed: {err:#}");
                    1
                }
            }
        }
    };

    if code != 0 {
        // Flush the file appender before the hard exit.
        drop(guard);
        std::process::exit(code);
    }
    Ok(())
}

fn init_logging(flag_level: Option<&str>, log: &LogSection) -> Result<Option<WorkerGuard>> {
    let fallback = flag_level.unwrap_or(&log.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let (file_layer, guard) = match &log.file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let name = path
                .file_name()
                .with_context(|| format!("log.file {} has no file name", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}
