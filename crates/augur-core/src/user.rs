//! Caller identity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The identity every store operation is scoped to.
///
/// The HTTP layer decides where this comes from; the store only ever sees the
/// id and never assumes a particular user.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:           UserId,
  pub username:     String,
  pub display_name: Option<String>,
  pub created_at:   DateTime<Utc>,
}
