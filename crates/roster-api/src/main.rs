//! roster server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `ROSTER_*`
//! environment variables, opens the SQLite store and serves the JSON API.
//!
//! # One-off legacy import
//!
//! ```
//! cargo run -p roster-api --bin server -- import --server branch --database gym.db
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use roster_api::{AppState, ServerConfig};
use roster_import::{ConnectionParams, Reconciler, SqliteLegacySource};
use roster_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Roster back-office server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Import the legacy database once and exit.
  Import {
    /// Legacy server name (a directory under `legacy_root`).
    #[arg(long)]
    server:   String,
    /// Legacy database name (a file under the server directory).
    #[arg(long)]
    database: String,
  },
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
    .add_source(config::Environment::with_prefix("ROSTER"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.media_root = expand_tilde(&server_cfg.media_root);
  server_cfg.legacy_root = server_cfg.legacy_root.as_deref().map(expand_tilde);

  if let Some(parent) = server_cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  // Open SQLite store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, server_cfg).await,
    Command::Import { server, database } => {
      import(&store, server_cfg.legacy_root.as_deref(), server, database).await
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  tokio::fs::create_dir_all(&server_cfg.media_root)
    .await
    .with_context(|| format!("failed to create {:?}", server_cfg.media_root))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(Arc::new(store), server_cfg);
  let app = roster_api::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn import(
  store: &SqliteStore,
  legacy_root: Option<&Path>,
  server: String,
  database: String,
) -> anyhow::Result<()> {
  let params = ConnectionParams::new(server, database);
  let legacy = SqliteLegacySource::connect(legacy_root, &params)
    .await
    .context("failed to open legacy database")?;
  let summary = Reconciler::new(store)
    .run(&legacy)
    .await
    .context("legacy import failed")?;
  println!("{}", serde_json::to_string_pretty(&summary)?);
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
