//! Handlers for `/batch` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/batch/readings` | Persist a whole session atomically |
//! | `GET`    | `/batch/summary` | Caller-wide statistics |
//! | `GET`    | `/batch/personas/:id/readings/count` | |
//! | `DELETE` | `/batch/personas/:id/readings` | Zero deletions is still success |

use augur_core::{
  DivinationMethod,
  batch::{NewBatch, Summary},
  persona::Persona,
  reading::Reading,
  store::DivinationStore,
  validate,
};
use axum::{Json, extract::State};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
  AppState,
  error::ApiError,
  extract::{ApiJson, ApiPath, Caller},
  readings::DEFAULT_AI_MODEL,
};

// ─── Submit ───────────────────────────────────────────────────────────────────

/// A finished divination session, sent once the client has every report.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  /// Display name of the persona the session was for.
  #[serde(alias = "user_name")]
  pub persona_name:          String,
  pub primary_question:      String,
  /// Optional echo of the chosen methods; checked when present.
  #[serde(default)]
  pub selected_methods:      Vec<String>,
  #[serde(default)]
  pub input_data:            Map<String, Value>,
  /// Method tag → report text. Tags are checked by the store, inside the
  /// batch transaction. Report texts carry no length rule.
  pub individual_reports:    IndexMap<String, String>,
  pub integrated_report:     Option<String>,
  pub character_archetypes:  Option<Vec<String>>,
  pub ai_model_used:         Option<String>,
  pub total_processing_time: Option<i64>,
}

impl SubmitBody {
  fn validate(self) -> Result<NewBatch, ApiError> {
    if !self.selected_methods.is_empty() {
      validate::report_count(self.selected_methods.len())?;
      for tag in &self.selected_methods {
        DivinationMethod::parse(tag)?;
      }
    }
    validate::report_count(self.individual_reports.len())?;

    Ok(NewBatch {
      persona_name:          validate::display_name(&self.persona_name)?,
      primary_question:      validate::question(
        "primary_question",
        &self.primary_question,
      )?,
      individual_reports:    self.individual_reports,
      input_data:            self.input_data,
      integrated_report:     self.integrated_report,
      character_archetypes:  self
        .character_archetypes
        .as_deref()
        .map(validate::archetypes)
        .transpose()?,
      ai_model_used:         Some(
        self.ai_model_used.unwrap_or_else(|| DEFAULT_AI_MODEL.to_owned()),
      ),
      total_processing_time: self.total_processing_time,
    })
  }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
  pub persona:             Persona,
  pub individual_readings: Vec<Reading>,
  pub integrated_reading:  Option<Reading>,
  pub success:             bool,
  pub message:             String,
}

/// `POST /batch/readings`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<SubmitBody>,
) -> Result<Json<SubmitResponse>, ApiError>
where
  S: DivinationStore + 'static,
{
  let batch = body.validate()?;
  let outcome = state
    .store
    .submit_batch(user, batch)
    .await
    .map_err(ApiError::store)?;

  let saved = outcome.individual_readings.len()
    + usize::from(outcome.integrated_reading.is_some());
  Ok(Json(SubmitResponse {
    persona:             outcome.persona,
    individual_readings: outcome.individual_readings,
    integrated_reading:  outcome.integrated_reading,
    success:             true,
    message:             format!("all {saved} readings saved"),
  }))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

/// `GET /batch/summary`
pub async fn summary<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
) -> Result<Json<Summary>, ApiError>
where
  S: DivinationStore + 'static,
{
  let summary = state.store.summary(user).await.map_err(ApiError::store)?;
  Ok(Json(summary))
}

// ─── Per-persona readings ────────────────────────────────────────────────────

/// `GET /batch/personas/:id/readings/count`
pub async fn reading_count<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(persona_id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: DivinationStore + 'static,
{
  let count = state
    .store
    .persona_reading_count(user, persona_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({
    "persona_id": persona_id,
    "reading_count": count,
    "success": true,
  })))
}

/// `DELETE /batch/personas/:id/readings`
pub async fn delete_readings<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(persona_id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: DivinationStore + 'static,
{
  let deleted = state
    .store
    .delete_persona_readings(user, persona_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({
    "success": true,
    "message": format!("deleted {deleted} reading(s)"),
    "deleted_count": deleted,
  })))
}
