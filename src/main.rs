use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fetchwise::cache::{CacheStorage, MemoryStorage, SqliteStorage};
use fetchwise::catalog::{Catalog, RecordId};
use fetchwise::config::{Config, LogConfig};
use fetchwise::usecase::UseCase;
use fetchwise::FetchResult;

#[derive(Parser, Debug)]
#[command(name = "fetchwise")]
#[command(about = "Fetch catalogue records through a local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fetchwise/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Keep the cache in memory for this run only
  #[arg(long)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List one page of records
  List {
    #[arg(short, long, default_value_t = 1)]
    page: u32,
    /// Skip the cache and fetch from the remote
    #[arg(short, long)]
    refresh: bool,
  },
  /// Show a single record
  Get {
    id: String,
    /// Skip the cache and fetch from the remote
    #[arg(short, long)]
    refresh: bool,
  },
  /// Search records (never cached)
  Search {
    text: String,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },
  /// Show what the cache holds for a page, without contacting the remote
  Peek {
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = init_logging(&config.log)?;

  if args.ephemeral {
    run(config, MemoryStorage::new(), args.command).await
  } else {
    let storage = match &config.cache.path {
      Some(path) => SqliteStorage::open_at(path)?,
      None => SqliteStorage::open()?,
    };
    run(config, storage, args.command).await
  }
}

async fn run<S: CacheStorage + 'static>(mut config: Config, storage: S, command: Command) -> Result<()> {
  // Detail caching is read-only, so a refresh only bypasses the lookup
  if let Command::Get { refresh: true, .. } = command {
    config.detail.force_reload = true;
  }
  let catalog = Catalog::open(&config, storage)?;

  let mut activity = catalog.activity().subscribe();
  tokio::spawn(async move {
    while let Some(busy) = activity.changed().await {
      debug!(busy, "activity");
    }
  });

  match command {
    Command::List { page, refresh } => {
      let query = catalog.page(page, refresh);
      let result = catalog.list.execute(Some(&query)).await;
      catalog.list.settle().await;
      print_result(result)
    }
    Command::Get { id, refresh } => {
      let id = RecordId(id);
      info!(%id, refresh, "fetching record");
      print_result(catalog.detail.execute(Some(&id)).await)
    }
    Command::Search { text, page } => {
      let query = catalog.search_query(&text, page);
      print_result(catalog.search.execute(Some(&query)).await)
    }
    Command::Peek { page } => {
      let query = catalog.page(page, false);
      match catalog.list.execute_cache(Some(&query)).await {
        Some(result) => print_result(result),
        None => Err(eyre!("No cache configured")),
      }
    }
  }
}

fn print_result<T: Serialize>(result: FetchResult<T>) -> Result<()> {
  let value = result?;
  println!("{}", serde_json::to_string_pretty(&value)?);
  Ok(())
}

/// Log to stderr, and to daily files when a log directory is configured.
fn init_logging(log: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fetchwise=info"));
  let stderr = fmt::layer().with_writer(std::io::stderr);

  match &log.dir {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, "fetchwise.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;
      Ok(None)
    }
  }
}
