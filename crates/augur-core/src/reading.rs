//! Readings and the links between integrated readings and their sources.
//!
//! A reading is immutable once written except for the caller feedback fields
//! (`is_favorite`, `user_rating`, `user_feedback`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use crate::{method::DivinationMethod, user::UserId};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Processing state of a reading. Readings arrive fully generated, so every
/// write path records `Completed`; the other states are kept for callers that
/// may one day persist in-flight work.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReadingStatus {
  Pending,
  Processing,
  #[default]
  Completed,
  Failed,
}

// ─── Reading ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
  pub id:               i64,
  pub user_id:          UserId,
  pub persona_id:       Option<i64>,
  pub method:           DivinationMethod,
  pub main_question:    String,
  pub output_text:      String,
  pub input_data:       Option<Map<String, Value>>,
  pub status:           ReadingStatus,
  pub ai_model_used:    Option<String>,
  /// Seconds spent generating the text.
  pub processing_time:  Option<i64>,
  /// 1–100.
  pub confidence_score: Option<u8>,
  pub is_favorite:      bool,
  /// 1–5.
  pub user_rating:      Option<u8>,
  pub user_feedback:    Option<String>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`crate::store::DivinationStore::create_reading`].
#[derive(Debug, Clone)]
pub struct NewReading {
  pub persona_id:       Option<i64>,
  pub method:           DivinationMethod,
  pub main_question:    String,
  pub output_text:      String,
  pub input_data:       Option<Map<String, Value>>,
  pub ai_model_used:    Option<String>,
  pub processing_time:  Option<i64>,
  pub confidence_score: Option<u8>,
}

impl NewReading {
  pub fn new(
    method: DivinationMethod,
    main_question: impl Into<String>,
    output_text: impl Into<String>,
  ) -> Self {
    Self {
      persona_id: None,
      method,
      main_question: main_question.into(),
      output_text: output_text.into(),
      input_data: None,
      ai_model_used: None,
      processing_time: None,
      confidence_score: None,
    }
  }
}

/// Caller feedback; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ReadingPatch {
  pub is_favorite:   Option<bool>,
  pub user_rating:   Option<u8>,
  pub user_feedback: Option<String>,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::DivinationStore::list_readings`]. Results
/// are always newest first.
#[derive(Debug, Clone)]
pub struct ReadingQuery {
  pub persona_id:     Option<i64>,
  pub method:         Option<DivinationMethod>,
  pub favorites_only: bool,
  pub limit:          u32,
  pub offset:         u32,
}

impl Default for ReadingQuery {
  fn default() -> Self {
    Self {
      persona_id:     None,
      method:         None,
      favorites_only: false,
      limit:          crate::validate::DEFAULT_PAGE_SIZE,
      offset:         0,
    }
  }
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// Records that an integrated reading draws on a source reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingSource {
  pub id:                    i64,
  pub integrated_reading_id: i64,
  pub source_reading_id:     i64,
  pub weight:                i64,
  pub created_at:            DateTime<Utc>,
}

/// A source of an integrated reading, as shown in its detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
  pub id:       i64,
  pub method:   DivinationMethod,
  pub question: String,
  pub weight:   i64,
}

/// An integrated reading that includes an ordinary reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegratedSummary {
  pub id:         i64,
  pub question:   String,
  pub created_at: DateTime<Utc>,
}

/// A reading with its link context. Exactly one of the two lists is
/// meaningful, depending on whether the reading is integrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingDetails {
  pub reading:             Reading,
  pub source_readings:     Vec<SourceSummary>,
  pub integrated_readings: Vec<IntegratedSummary>,
}
