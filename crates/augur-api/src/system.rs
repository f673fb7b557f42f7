//! Service-level endpoints: `/`, `/health`, `/info` and the 404 fallback.

use augur_core::{DivinationMethod, store::DivinationStore};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde_json::{Value, json};
use strum::IntoEnumIterator as _;

use crate::{AppState, error::ApiError};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `GET /`
pub async fn root() -> Json<Value> {
  Json(json!({
    "message": "Welcome to the Augur divination API",
    "version": VERSION,
    "status": "running",
    "timestamp": Utc::now(),
    "endpoints": {
      "personas": "/personas",
      "readings": "/readings",
      "batch": "/batch",
      "health": "/health",
      "info": "/info",
    },
  }))
}

/// `GET /health`
///
/// Always answers; a failing database shows up in the body and as a 503.
pub async fn health<S>(State(state): State<AppState<S>>) -> (StatusCode, Json<Value>)
where
  S: DivinationStore + 'static,
{
  let (status, database) = match state.store.ping().await {
    Ok(()) => (StatusCode::OK, "healthy".to_owned()),
    Err(e) => {
      tracing::warn!(error = %e, "health check: database unreachable");
      (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {e}"))
    }
  };
  let overall = if status.is_success() { "healthy" } else { "unhealthy" };
  (
    status,
    Json(json!({
      "status": overall,
      "timestamp": Utc::now(),
      "version": VERSION,
      "services": { "api": "healthy", "database": database },
    })),
  )
}

/// `GET /info`
pub async fn info() -> Json<Value> {
  let methods: Vec<Value> = DivinationMethod::iter()
    .map(|m| json!({ "method": m, "description": m.description() }))
    .collect();
  Json(json!({
    "name": "Augur",
    "version": VERSION,
    "description": "Storage backend for multi-method divination readings",
    "features": [
      "persona management",
      "atomic batch submission",
      "single reading management",
      "usage statistics",
      "multiple divination methods",
    ],
    "divination_methods": methods,
  }))
}

/// Fallback for unmatched routes, so they get the error envelope too.
pub async fn not_found() -> ApiError {
  ApiError::NotFound("no such endpoint".into())
}

/// Fallback for a known path hit with the wrong verb.
pub async fn method_not_allowed() -> ApiError {
  ApiError::MethodNotAllowed("method not allowed on this endpoint".into())
}
