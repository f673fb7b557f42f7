//! API error type, the JSON error envelope and its
//! [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the API as
//! `{"error", "status_code", "timestamp", "path"}`. Handlers never see the
//! request path, so [`IntoResponse`] stashes the envelope in the response
//! extensions and [`stamp_path`] fills the path in on the way out.

use axum::{
  Json,
  extract::{
    Request,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  middleware::Next,
  response::{IntoResponse, Response},
};
use augur_core::store::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  MethodNotAllowed(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  UnsupportedMediaType(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store failure. Domain errors keep their meaning; anything
  /// the backend raised on its own is a 500.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.domain() {
      Some(domain) => Self::domain(domain),
      None => Self::Internal(Box::new(e)),
    }
  }

  fn domain(e: &augur_core::Error) -> Self {
    use augur_core::Error as E;
    match e {
      E::Validation { .. } | E::InvalidMethod(_) => Self::BadRequest(e.to_string()),
      E::UserNotFound(_) | E::PersonaNotFound(_) | E::ReadingNotFound(_) => {
        Self::NotFound(e.to_string())
      }
      E::PersonaHasReadings { .. } | E::DuplicatePersonaName(_) => {
        Self::Conflict(e.to_string())
      }
      E::Serialization(_) => Self::Internal(e.to_string().into()),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<augur_core::Error> for ApiError {
  fn from(e: augur_core::Error) -> Self { Self::domain(&e) }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self {
    match r.status() {
      StatusCode::UNSUPPORTED_MEDIA_TYPE => {
        Self::UnsupportedMediaType(r.body_text())
      }
      _ => Self::BadRequest(r.body_text()),
    }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { Self::BadRequest(r.body_text()) }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// The body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
  pub error:       String,
  pub status_code: u16,
  pub timestamp:   DateTime<Utc>,
  pub path:        String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::warn!(error = %self, "request failed");
    }
    let body = ErrorBody {
      error:       self.to_string(),
      status_code: status.as_u16(),
      timestamp:   Utc::now(),
      path:        String::new(),
    };
    let mut res = (status, Json(body.clone())).into_response();
    res.extensions_mut().insert(body);
    res
  }
}

/// Middleware: rewrite error envelopes with the path of the request that
/// produced them.
pub async fn stamp_path(req: Request, next: Next) -> Response {
  let path = req.uri().path().to_owned();
  let mut res = next.run(req).await;
  match res.extensions_mut().remove::<ErrorBody>() {
    Some(body) => {
      let status = res.status();
      (status, Json(ErrorBody { path, ..body })).into_response()
    }
    None => res,
  }
}
