//! Handlers for `/readings` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/readings/` | Single reading; 404 for an unknown persona |
//! | `GET`    | `/readings/` | `?persona_id=&method=&limit=&offset=` |
//! | `GET`    | `/readings/favorites/list` | `?limit=&offset=` |
//! | `GET`    | `/readings/methods/:method/list` | `?limit=&offset=` |
//! | `GET`    | `/readings/:id` | 404 if not found |
//! | `GET`    | `/readings/:id/details` | With linked source / integrated readings |
//! | `PUT`    | `/readings/:id` | Favorite, rating and feedback |
//! | `DELETE` | `/readings/:id` | Links cascade |

use augur_core::{
  DivinationMethod,
  reading::{NewReading, Reading, ReadingDetails, ReadingPatch, ReadingQuery},
  store::DivinationStore,
  validate,
};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
  AppState,
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery, Caller},
};

/// Recorded when a client does not say which model produced the text.
pub const DEFAULT_AI_MODEL: &str = "gemini-pro";

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub persona_id:       Option<i64>,
  pub method:           String,
  pub main_question:    String,
  pub output_text:      String,
  pub input_data:       Option<Map<String, Value>>,
  pub ai_model_used:    Option<String>,
  pub processing_time:  Option<i64>,
  pub confidence_score: Option<u8>,
}

impl CreateBody {
  fn validate(self) -> Result<NewReading, ApiError> {
    Ok(NewReading {
      persona_id:       self.persona_id,
      method:           DivinationMethod::parse(&self.method)?,
      main_question:    validate::question(
        "main_question",
        &self.main_question,
      )?,
      output_text:      validate::report_text(
        "output_text",
        &self.output_text,
      )?,
      input_data:       self.input_data,
      ai_model_used:    Some(
        self.ai_model_used.unwrap_or_else(|| DEFAULT_AI_MODEL.to_owned()),
      ),
      processing_time:  self.processing_time,
      confidence_score: self
        .confidence_score
        .map(validate::confidence)
        .transpose()?,
    })
  }
}

/// `POST /readings/`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<Json<Reading>, ApiError>
where
  S: DivinationStore + 'static,
{
  let input = body.validate()?;
  let reading = state
    .store
    .create_reading(user, input)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(reading))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub persona_id: Option<i64>,
  pub method:     Option<String>,
  pub limit:      Option<u32>,
  pub offset:     Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub limit:  Option<u32>,
  pub offset: Option<u32>,
}

async fn run_query<S>(
  state: &AppState<S>,
  user: augur_core::UserId,
  query: ReadingQuery,
) -> Result<Json<Vec<Reading>>, ApiError>
where
  S: DivinationStore + 'static,
{
  let readings = state
    .store
    .list_readings(user, query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(readings))
}

/// `GET /readings/[?persona_id=&method=&limit=&offset=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Reading>>, ApiError>
where
  S: DivinationStore + 'static,
{
  let query = ReadingQuery {
    persona_id:     params.persona_id,
    method:         params
      .method
      .as_deref()
      .map(DivinationMethod::parse)
      .transpose()?,
    favorites_only: false,
    limit:          validate::page_limit(params.limit)?,
    offset:         params.offset.unwrap_or(0),
  };
  run_query(&state, user, query).await
}

/// `GET /readings/favorites/list[?limit=&offset=]`
pub async fn favorites<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<Vec<Reading>>, ApiError>
where
  S: DivinationStore + 'static,
{
  let query = ReadingQuery {
    favorites_only: true,
    limit: validate::page_limit(page.limit)?,
    offset: page.offset.unwrap_or(0),
    ..ReadingQuery::default()
  };
  run_query(&state, user, query).await
}

/// `GET /readings/methods/:method/list[?limit=&offset=]`
pub async fn by_method<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(method): ApiPath<String>,
  ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<Vec<Reading>>, ApiError>
where
  S: DivinationStore + 'static,
{
  let query = ReadingQuery {
    method: Some(DivinationMethod::parse(&method)?),
    limit: validate::page_limit(page.limit)?,
    offset: page.offset.unwrap_or(0),
    ..ReadingQuery::default()
  };
  run_query(&state, user, query).await
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /readings/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<Reading>, ApiError>
where
  S: DivinationStore + 'static,
{
  let reading = state
    .store
    .get_reading(user, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("reading not found: {id}")))?;
  Ok(Json(reading))
}

/// `GET /readings/:id/details`
pub async fn details<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<ReadingDetails>, ApiError>
where
  S: DivinationStore + 'static,
{
  let details = state.store.reading_details(user, id).await.map_err(ApiError::store)?;
  Ok(Json(details))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub is_favorite:   Option<bool>,
  pub user_rating:   Option<u8>,
  pub user_feedback: Option<String>,
}

/// `PUT /readings/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(id): ApiPath<i64>,
  ApiJson(body): ApiJson<UpdateBody>,
) -> Result<Json<Reading>, ApiError>
where
  S: DivinationStore + 'static,
{
  let patch = ReadingPatch {
    is_favorite:   body.is_favorite,
    user_rating:   body.user_rating.map(validate::rating).transpose()?,
    user_feedback: body
      .user_feedback
      .as_deref()
      .map(validate::feedback)
      .transpose()?,
  };
  let reading = state
    .store
    .update_reading(user, id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(reading))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /readings/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: DivinationStore + 'static,
{
  state.store.delete_reading(user, id).await.map_err(ApiError::store)?;
  Ok(Json(json!({
    "message": format!("reading {id} deleted"),
    "success": true,
  })))
}
