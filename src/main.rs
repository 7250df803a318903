mod cache;
mod cart;
mod commands;
mod config;
mod shop;
mod storage;

use chrono::Duration;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::cache::CacheLayer;
use crate::cart::{CartStore, StorageSync};
use crate::shop::{CachedShopClient, FakeStoreClient};
use crate::storage::{KeyValueStore, MemoryStore, SqliteStorage};

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "Browse the catalog and manage a shopping cart from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/storefront/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Catalog API base URL
  #[arg(long, global = true)]
  base_url: Option<String>,

  /// Keep cache and cart in memory only
  #[arg(long, global = true)]
  no_persist: bool,

  /// Write logs to this file instead of stderr
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  /// Increase log verbosity (-v info, -vv debug)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging(args.verbose, args.log_file.as_deref())?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }

  let store: Arc<dyn KeyValueStore> = if args.no_persist {
    Arc::new(MemoryStore::new())
  } else {
    match &config.storage.path {
      Some(path) => Arc::new(SqliteStorage::open_at(path)?),
      None => Arc::new(SqliteStorage::open()?),
    }
  };

  let ttl = i64::try_from(config.cache.ttl_secs)
    .ok()
    .and_then(Duration::try_seconds)
    .ok_or_else(|| eyre!("cache.ttl_secs out of range: {}", config.cache.ttl_secs))?;

  let api = FakeStoreClient::new(&config.api)?;
  let shop = CachedShopClient::new(api, CacheLayer::new(Arc::clone(&store)).with_ttl(ttl));

  let mut cart = CartStore::from_store(store.as_ref());
  StorageSync::new(Arc::clone(&store)).attach(&mut cart);

  let mut stdout = std::io::stdout().lock();
  commands::run(args.command, &shop, &mut cart, &mut stdout).await
}

/// Set up the tracing subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let default_level = match verbose {
    0 => "storefront=warn",
    1 => "storefront=info",
    _ => "storefront=debug",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  match log_file {
    Some(path) => {
      let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
      let appender = tracing_appender::rolling::never(dir, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

      Ok(None)
    }
  }
}
