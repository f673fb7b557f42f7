//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order is chronological order. Archetype lists and input
//! bags are stored as compact JSON.

use augur_core::{
  DivinationMethod, UserId,
  persona::Persona,
  reading::{Reading, ReadingSource, ReadingStatus},
  user::User,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_method(s: &str) -> Result<DivinationMethod> {
  s.parse().map_err(|_| Error::Corrupt { column: "method", value: s.to_owned() })
}

pub fn decode_status(s: &str) -> Result<ReadingStatus> {
  s.parse().map_err(|_| Error::Corrupt { column: "status", value: s.to_owned() })
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_input(input: Option<&Map<String, Value>>) -> Result<Option<String>> {
  Ok(input.map(serde_json::to_string).transpose()?)
}

pub fn decode_input(s: Option<&str>) -> Result<Option<Map<String, Value>>> {
  Ok(s.map(serde_json::from_str).transpose()?)
}

/// Small integers that the schema constrains to 1..=100.
fn decode_small(column: &'static str, v: Option<i64>) -> Result<Option<u8>> {
  v.map(|n| {
    u8::try_from(n).map_err(|_| Error::Corrupt { column, value: n.to_string() })
  })
  .transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "id, username, display_name, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:           i64,
  pub username:     String,
  pub display_name: Option<String>,
  pub created_at:   String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      username:     row.get(1)?,
      display_name: row.get(2)?,
      created_at:   row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:           UserId(self.id),
      username:     self.username,
      display_name: self.display_name,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Column list for a `personas p` select, including the computed
/// reading count.
pub const PERSONA_COLUMNS: &str = "
  p.id, p.user_id, p.display_name, p.description,
  p.birth_date, p.birth_time, p.birth_location, p.gender,
  p.character_archetypes,
  (SELECT COUNT(*) FROM readings r WHERE r.persona_id = p.id),
  p.created_at, p.updated_at";

/// Raw values read directly from a `personas` row.
pub struct RawPersona {
  pub id:                   i64,
  pub user_id:              i64,
  pub display_name:         String,
  pub description:          Option<String>,
  pub birth_date:           Option<String>,
  pub birth_time:           Option<String>,
  pub birth_location:       Option<String>,
  pub gender:               Option<String>,
  pub character_archetypes: String,
  pub reading_count:        i64,
  pub created_at:           String,
  pub updated_at:           String,
}

impl RawPersona {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      user_id:              row.get(1)?,
      display_name:         row.get(2)?,
      description:          row.get(3)?,
      birth_date:           row.get(4)?,
      birth_time:           row.get(5)?,
      birth_location:       row.get(6)?,
      gender:               row.get(7)?,
      character_archetypes: row.get(8)?,
      reading_count:        row.get(9)?,
      created_at:           row.get(10)?,
      updated_at:           row.get(11)?,
    })
  }

  pub fn into_persona(self) -> Result<Persona> {
    Ok(Persona {
      id:                   self.id,
      user_id:              UserId(self.user_id),
      display_name:         self.display_name,
      description:          self.description,
      birth_date:           self.birth_date,
      birth_time:           self.birth_time,
      birth_location:       self.birth_location,
      gender:               self.gender,
      character_archetypes: decode_tags(&self.character_archetypes)?,
      reading_count:        self.reading_count.max(0) as u64,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
    })
  }
}

pub const READING_COLUMNS: &str = "
  id, user_id, persona_id, method, main_question, output_text, input_data,
  status, ai_model_used, processing_time, confidence_score, is_favorite,
  user_rating, user_feedback, created_at, updated_at";

/// Raw values read directly from a `readings` row.
pub struct RawReading {
  pub id:               i64,
  pub user_id:          i64,
  pub persona_id:       Option<i64>,
  pub method:           String,
  pub main_question:    String,
  pub output_text:      String,
  pub input_data:       Option<String>,
  pub status:           String,
  pub ai_model_used:    Option<String>,
  pub processing_time:  Option<i64>,
  pub confidence_score: Option<i64>,
  pub is_favorite:      bool,
  pub user_rating:      Option<i64>,
  pub user_feedback:    Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawReading {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      user_id:          row.get(1)?,
      persona_id:       row.get(2)?,
      method:           row.get(3)?,
      main_question:    row.get(4)?,
      output_text:      row.get(5)?,
      input_data:       row.get(6)?,
      status:           row.get(7)?,
      ai_model_used:    row.get(8)?,
      processing_time:  row.get(9)?,
      confidence_score: row.get(10)?,
      is_favorite:      row.get(11)?,
      user_rating:      row.get(12)?,
      user_feedback:    row.get(13)?,
      created_at:       row.get(14)?,
      updated_at:       row.get(15)?,
    })
  }

  pub fn into_reading(self) -> Result<Reading> {
    Ok(Reading {
      id:               self.id,
      user_id:          UserId(self.user_id),
      persona_id:       self.persona_id,
      method:           decode_method(&self.method)?,
      main_question:    self.main_question,
      output_text:      self.output_text,
      input_data:       decode_input(self.input_data.as_deref())?,
      status:           decode_status(&self.status)?,
      ai_model_used:    self.ai_model_used,
      processing_time:  self.processing_time,
      confidence_score: decode_small("confidence_score", self.confidence_score)?,
      is_favorite:      self.is_favorite,
      user_rating:      decode_small("user_rating", self.user_rating)?,
      user_feedback:    self.user_feedback,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `reading_sources` row.
pub struct RawSource {
  pub id:                    i64,
  pub integrated_reading_id: i64,
  pub source_reading_id:     i64,
  pub weight:                i64,
  pub created_at:            String,
}

impl RawSource {
  pub fn into_source(self) -> Result<ReadingSource> {
    Ok(ReadingSource {
      id:                    self.id,
      integrated_reading_id: self.integrated_reading_id,
      source_reading_id:     self.source_reading_id,
      weight:                self.weight,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}
