//! Personas: named profiles that group a caller's readings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// A named profile, unique per user by `display_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
  pub id:                   i64,
  pub user_id:              UserId,
  pub display_name:         String,
  pub description:          Option<String>,
  pub birth_date:           Option<String>,
  /// `HH:MM`, as supplied.
  pub birth_time:           Option<String>,
  pub birth_location:       Option<String>,
  pub gender:               Option<String>,
  pub character_archetypes: Vec<String>,
  /// Number of readings currently attached; computed on read.
  pub reading_count:        u64,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

/// Input to [`crate::store::DivinationStore::create_persona`].
#[derive(Debug, Clone, Default)]
pub struct NewPersona {
  pub display_name:         String,
  pub description:          Option<String>,
  pub birth_date:           Option<String>,
  pub birth_time:           Option<String>,
  pub birth_location:       Option<String>,
  pub gender:               Option<String>,
  pub character_archetypes: Vec<String>,
}

/// Description given to personas created implicitly by a batch submission.
pub const SESSION_PERSONA_DESCRIPTION: &str =
  "Created from a divination session";

impl NewPersona {
  pub fn named(display_name: impl Into<String>) -> Self {
    Self { display_name: display_name.into(), ..Self::default() }
  }

  /// A persona created by a batch for a name the caller has not used yet.
  pub fn from_session(display_name: impl Into<String>) -> Self {
    Self {
      description: Some(SESSION_PERSONA_DESCRIPTION.to_owned()),
      ..Self::named(display_name)
    }
  }

  /// Fill in `Persona profile: <name>` when no description was supplied.
  pub fn with_default_description(mut self) -> Self {
    if self.description.is_none() {
      self.description = Some(format!("Persona profile: {}", self.display_name));
    }
    self
  }
}

/// A partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PersonaPatch {
  pub display_name:         Option<String>,
  pub description:          Option<String>,
  pub birth_date:           Option<String>,
  pub birth_time:           Option<String>,
  pub birth_location:       Option<String>,
  pub gender:               Option<String>,
  pub character_archetypes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaStatistics {
  pub total_readings:     u64,
  pub completed_readings: u64,
  pub favorite_readings:  u64,
  /// Reading count keyed by method tag.
  pub method_breakdown:   BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaStats {
  pub persona:    Persona,
  pub statistics: PersonaStatistics,
}
