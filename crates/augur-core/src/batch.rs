//! Batch submission types and the caller-wide summary.
//!
//! A batch persists one whole divination session at once: the persona, one
//! reading per method and an optional integrated reading that links back to
//! them. The store applies it as a single transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
  method::DivinationMethod,
  persona::Persona,
  reading::{Reading, ReadingSource},
  user::UserId,
};

/// Input to [`crate::store::DivinationStore::submit_batch`].
///
/// Method tags in `individual_reports` are left unparsed: an unknown tag must
/// abort the batch from inside the transaction, after earlier rows have been
/// written, so that the rollback path is the one that discards them.
#[derive(Debug, Clone, Default)]
pub struct NewBatch {
  pub persona_name:          String,
  pub primary_question:      String,
  /// Method tag → generated report text, in submission order.
  pub individual_reports:    IndexMap<String, String>,
  pub input_data:            Map<String, Value>,
  pub integrated_report:     Option<String>,
  pub character_archetypes:  Option<Vec<String>>,
  pub ai_model_used:         Option<String>,
  pub total_processing_time: Option<i64>,
}

/// Everything a successful batch wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
  pub persona:             Persona,
  pub individual_readings: Vec<Reading>,
  pub integrated_reading:  Option<Reading>,
  pub links:               Vec<ReadingSource>,
}

/// Split a total processing time evenly across `count` readings.
///
/// Integer division; the remainder is dropped. A missing or non-positive
/// total yields `None`, as does an empty batch.
pub fn processing_share(total: Option<i64>, count: usize) -> Option<i64> {
  match total {
    Some(t) if t > 0 && count > 0 => Some(t / count as i64),
    _ => None,
  }
}

/// `input_data` recorded on an integrated reading.
pub fn integrated_input(
  source_methods: &[DivinationMethod],
  archetypes: Option<&[String]>,
) -> Map<String, Value> {
  let value = json!({
    "source_methods": source_methods,
    "total_individual_reports": source_methods.len(),
    "character_archetypes": archetypes,
  });
  match value {
    Value::Object(map) => map,
    _ => Map::new(),
  }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
  pub id:         UserId,
  pub username:   String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStatistics {
  pub total_personas:    u64,
  pub total_readings:    u64,
  pub favorite_readings: u64,
  pub method_breakdown:  BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentReading {
  pub id:          i64,
  pub method:      DivinationMethod,
  pub question:    String,
  pub created_at:  DateTime<Utc>,
  pub is_favorite: bool,
}

/// Caller-wide usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
  pub user_info:       UserInfo,
  pub statistics:      SummaryStatistics,
  pub recent_readings: Vec<RecentReading>,
}

/// How many recent readings [`Summary`] carries.
pub const RECENT_READINGS: u32 = 5;

const PREVIEW_CHARS: usize = 50;

/// Shorten a question for list previews: 50 characters then `...`.
pub fn preview_question(question: &str) -> String {
  if question.chars().count() > PREVIEW_CHARS {
    let head: String = question.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
  } else {
    question.to_owned()
  }
}
