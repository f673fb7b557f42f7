//! HTTP server wiring for Augur.
//!
//! Holds the runtime configuration and wraps the API router from
//! [`augur_api`] with request tracing and CORS.

use std::path::{Path, PathBuf};

use augur_api::AppState;
use augur_core::store::DivinationStore;
use axum::Router;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Deployment mode. Selects which database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Production,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  pub development: PathBuf,
  pub production:  PathBuf,
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      development: PathBuf::from("divination.db"),
      production:  PathBuf::from("divination.db"),
    }
  }
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `AUGUR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:         String,
  pub port:         u16,
  pub environment:  Environment,
  /// Username requests act for when they carry no `X-User-Id`. Created at
  /// startup if missing.
  pub default_user: String,
  pub database:     DatabaseConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:         "0.0.0.0".into(),
      port:         8000,
      environment:  Environment::Development,
      default_user: "testuser".into(),
      database:     DatabaseConfig::default(),
    }
  }
}

impl ServerConfig {
  /// The database file for the configured environment.
  pub fn database_path(&self) -> &Path {
    match self.environment {
      Environment::Development => &self.database.development,
      Environment::Production => &self.database.production,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The full application: API routes plus tracing and CORS layers.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: DivinationStore + 'static,
{
  augur_api::api_router(state)
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}
