mod app;
mod cache;
mod catalog;
mod config;
mod error;
mod event;
mod export;
mod logging;
mod prefs;
mod query;
mod server;
mod ui;

use catalog::{CachedCatalogClient, CatalogClient, FetchLimit, ProductSource, RawQuery};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use config::Config;
use export::{CsvEncoder, ExportEncoder};
use prefs::{MemoryPreferences, PreferenceStore, SqlitePreferences};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use ui::views::ListContext;

#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(about = "A terminal admin console for a product catalog")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/catalog/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Product API base URL, overriding the config file
  #[arg(long, global = true)]
  api_url: Option<String>,

  /// Read the local SQLite database directly instead of the API
  #[arg(long, global = true)]
  local: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Serve the product REST API
  Serve {
    /// Address to listen on (default: server.bind from config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Do not seed an empty database with sample products
    #[arg(long)]
    no_seed: bool,
  },
  /// Replace the local database contents with generated products
  Seed {
    #[arg(short = 'n', long, default_value_t = 1000)]
    count: usize,
  },
  /// Export every matching product to CSV
  Export {
    /// Case-insensitive name substring
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    status: Option<String>,
    /// id, price, stock or createdAt
    #[arg(long)]
    sort: Option<String>,
    /// ascend or descend
    #[arg(long)]
    order: Option<String>,
    /// Output file (default: products_YYYYMMDD.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url.clone() {
    config.api.url = url;
  }

  match args.command {
    Some(Command::Serve { bind, no_seed }) => {
      logging::init_stderr()?;
      let store = server::open_store(&config, no_seed)?;
      let bind = bind.unwrap_or_else(|| config.server.bind.clone());
      server::serve(store, &bind).await
    }
    Some(Command::Seed { count }) => {
      logging::init_stderr()?;
      seed(&config, count)
    }
    Some(Command::Export {
      name,
      category,
      status,
      sort,
      order,
      output,
    }) => {
      logging::init_stderr()?;
      let raw = RawQuery {
        name,
        category,
        status,
        sort_field: sort,
        sort_order: order,
        limit: None,
      };
      export(&config, args.local, &raw, output).await
    }
    None => run_tui(config, args.local).await,
  }
}

/// Product source for the client side: the API, or the local database
fn connect(config: &Config, local: bool) -> Result<Arc<dyn ProductSource>> {
  if local {
    let store = server::open_store(config, false)?;
    info!("using local database");
    Ok(Arc::new(store))
  } else {
    Ok(Arc::new(CatalogClient::new(config)?))
  }
}

fn seed(config: &Config, count: usize) -> Result<()> {
  let store = server::open_store(config, true)?;
  let products = server::seed::generate_products(count);
  let inserted = store
    .replace_all(&products)
    .map_err(|e| eyre!("Failed to seed database: {}", e))?;
  println!("Seeded {} products", inserted);
  Ok(())
}

async fn export(
  config: &Config,
  local: bool,
  raw: &RawQuery,
  output: Option<PathBuf>,
) -> Result<()> {
  let default_limit = FetchLimit::new(config.view.default_fetch_limit)
    .ok_or_else(|| eyre!("view.default_fetch_limit must be positive"))?;
  let query = raw.parse(default_limit)?;

  let client = CachedCatalogClient::new(connect(config, local)?, config.limits);
  let encoder = CsvEncoder;
  let path = output.unwrap_or_else(|| {
    PathBuf::from(export::default_filename(
      chrono::Local::now().date_naive(),
      encoder.extension(),
    ))
  });

  match client
    .request_export(&query.filter, &query.sort, &encoder, &path)
    .await
  {
    Ok(summary) => {
      println!(
        "Exported {} products to {}",
        summary.records,
        summary.path.display()
      );
      Ok(())
    }
    Err(e) if e.is_empty_result() => {
      println!("No products match; nothing exported");
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}

fn open_prefs(data_dir: &std::path::Path) -> Arc<dyn PreferenceStore> {
  match SqlitePreferences::open(&data_dir.join("prefs.db")) {
    Ok(store) => Arc::new(store),
    Err(e) => {
      warn!(error = %e, "preferences unavailable, falling back to memory");
      Arc::new(MemoryPreferences::new())
    }
  }
}

async fn run_tui(config: Config, local: bool) -> Result<()> {
  let data_dir = Config::data_dir()?;
  let _guard = logging::init_file(&data_dir.join("logs"))?;

  let prefs = open_prefs(&data_dir);
  let default_limit = FetchLimit::new(config.view.default_fetch_limit)
    .ok_or_else(|| eyre!("view.default_fetch_limit must be positive"))?;
  let limit = prefs::load_fetch_limit(prefs.as_ref(), default_limit);

  let client = CachedCatalogClient::new(connect(&config, local)?, config.limits);
  let export_dir = std::env::current_dir()
    .map_err(|e| eyre!("Failed to read current directory: {}", e))?;

  let ctx = ListContext {
    client,
    prefs,
    encoder: Arc::new(CsvEncoder),
    export_dir,
    page_size_options: config.view.page_size_options.clone(),
  };

  let title = if local {
    format!("{} (local)", config.display_title())
  } else {
    config.display_title()
  };

  let mut app = app::App::new(title, ctx, config.view.page_size, limit);
  app.run().await
}
