mod app;
mod cache;
mod commands;
mod config;
mod dart;
mod event;
mod query;
mod relay;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "dartdash=info";

#[derive(Parser, Debug)]
#[command(name = "dartdash")]
#[command(about = "A terminal dashboard for DART corporate disclosures")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./dartdash.yaml, then $XDG_CONFIG_HOME/dartdash/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Corporation code to open with
  #[arg(long)]
  corp: Option<String>,

  /// Write logs to this file instead of the daily log directory
  #[arg(long)]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Run the CORS relay for browser front-ends
  Relay {
    /// Port to listen on (overrides relay.port)
    #[arg(short, long)]
    port: Option<u16>,
  },
}

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// The terminal belongs to the UI, so the dashboard logs to a file.
fn init_file_tracing(log_file: Option<&Path>) -> Result<WorkerGuard> {
  let appender = match log_file {
    Some(path) => {
      let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
      let name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      tracing_appender::rolling::never(dir, name)
    }
    None => {
      let dir = dirs::data_dir()
        .ok_or_else(|| eyre!("Could not determine data directory"))?
        .join("dartdash")
        .join("logs");
      std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      tracing_appender::rolling::daily(dir, "dartdash.log")
    }
  };

  let (writer, guard) = tracing_appender::non_blocking(appender);
  tracing_subscriber::registry()
    .with(env_filter())
    .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
    .init();
  Ok(guard)
}

/// Runs once a subscriber is installed; `Config::load` happens before that.
fn log_config_source(config: &config::Config) {
  match &config.source {
    Some(path) => tracing::info!(path = %path.display(), "loaded config"),
    None => tracing::debug!("no config file found, using defaults"),
  }
}

fn init_stderr_tracing() {
  tracing_subscriber::registry()
    .with(env_filter())
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let mut config = config::Config::load(args.config.as_deref())?;

  match args.command {
    Some(Commands::Relay { port }) => {
      init_stderr_tracing();
      log_config_source(&config);
      if let Some(port) = port {
        config.relay.port = port;
      }
      relay::run(&config.relay).await
    }
    None => {
      let _guard = init_file_tracing(args.log_file.as_deref())?;
      log_config_source(&config);

      if let Some(corp) = args.corp {
        config.default_corp_code = Some(corp);
      }

      tracing::info!(
        host = %config.api.host(),
        cache = config.cache.enabled,
        "starting dashboard"
      );
      let mut app = app::App::new(config)?;
      app.run().await
    }
  }
}
