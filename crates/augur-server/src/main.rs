//! augur server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) and `AUGUR_*`
//! environment variables, opens the SQLite store for the configured
//! environment, makes sure the default user exists, and serves the JSON API
//! over HTTP.
//!
//! ```text
//! AUGUR_ENVIRONMENT=production AUGUR_DATABASE__PRODUCTION=/srv/augur.db augur
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use augur_api::AppState;
use augur_core::store::DivinationStore as _;
use augur_server::ServerConfig;
use augur_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Augur divination reading server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
    .add_source(config::Environment::with_prefix("AUGUR").separator("__"))
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(server_cfg.database_path());
  tracing::info!(
    environment = ?server_cfg.environment,
    database = %store_path.display(),
    "opening store"
  );

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let default_user = store
    .ensure_user(&server_cfg.default_user)
    .await
    .with_context(|| format!("failed to ensure user {:?}", server_cfg.default_user))?;
  tracing::info!(
    user = %default_user.id,
    username = %default_user.username,
    "default user ready"
  );

  let app = augur_server::app(AppState::new(Arc::new(store), default_user.id));
  let address = server_cfg.address();

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
