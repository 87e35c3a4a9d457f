//! carbon-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `CARBON_*`
//! environment variables, loads the ledger from the data directory, and
//! serves the JSON API over HTTP.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `CARBON_INSIGHTS__ENDPOINT=http://localhost:7000`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use carbon_api::{AppState, HttpInsights, ServerConfig};
use carbon_core::ledger::Ledger;
use carbon_store_json::JsonFileStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Carbon ledger HTTP server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Override the data directory from the configuration.
  #[arg(long)]
  data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("CARBON")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  if let Some(dir) = cli.data_dir {
    server_cfg.data_dir = dir;
  }

  // Expand `~` in the data directory.
  let data_dir = expand_tilde(&server_cfg.data_dir);

  // Open the store and load the collection.
  let store = JsonFileStore::in_dir(&data_dir)
    .with_context(|| format!("failed to open data directory {data_dir:?}"))?;
  // A corrupt file is logged and preserved by `Ledger::open`; serve empty.
  let (ledger, _recovery) = tokio::task::spawn_blocking(move || Ledger::open(store))
    .await
    .context("loading records")?;

  let insights = server_cfg
    .insights
    .clone()
    .map(HttpInsights::new)
    .transpose()?;
  if insights.is_none() {
    tracing::info!("no insights endpoint configured; /insights routes will return 503");
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(ledger, insights, server_cfg);
  let app = carbon_api::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
