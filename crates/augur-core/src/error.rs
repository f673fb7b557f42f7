//! Error types for `augur-core`.

use thiserror::Error;

use crate::user::UserId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {field}: {reason}")]
  Validation { field: &'static str, reason: String },

  #[error("invalid divination method: {0:?}")]
  InvalidMethod(String),

  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("persona not found: {0}")]
  PersonaNotFound(i64),

  #[error("reading not found: {0}")]
  ReadingNotFound(i64),

  #[error(
    "persona {persona_id} still owns {count} reading(s); delete them first"
  )]
  PersonaHasReadings { persona_id: i64, count: u64 },

  #[error("a persona named {0:?} already exists")]
  DuplicatePersonaName(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Validation { field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
