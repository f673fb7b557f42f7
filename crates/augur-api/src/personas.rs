//! Handlers for `/personas` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/personas/` | Create, or return the existing persona with that name |
//! | `GET`    | `/personas/` | Newest first |
//! | `GET`    | `/personas/search` | `?name=<text>[&fuzzy=true]` |
//! | `GET`    | `/personas/:id` | 404 if not found |
//! | `GET`    | `/personas/:id/stats` | Reading statistics |
//! | `PUT`    | `/personas/:id` | Partial update; 409 on a duplicate name |
//! | `DELETE` | `/personas/:id` | 409 while readings reference it |

use augur_core::{
  persona::{NewPersona, Persona, PersonaPatch, PersonaStats},
  store::DivinationStore,
  validate,
};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery, Caller},
};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub display_name:         String,
  pub description:          Option<String>,
  pub birth_date:           Option<String>,
  pub birth_time:           Option<String>,
  pub birth_location:       Option<String>,
  pub gender:               Option<String>,
  #[serde(default)]
  pub character_archetypes: Vec<String>,
}

impl CreateBody {
  fn validate(self) -> Result<NewPersona, ApiError> {
    Ok(NewPersona {
      display_name:         validate::display_name(&self.display_name)?,
      description:          self
        .description
        .as_deref()
        .map(validate::description)
        .transpose()?,
      birth_date:           self.birth_date,
      birth_time:           self.birth_time,
      birth_location:       self.birth_location,
      gender:               self.gender,
      character_archetypes: validate::archetypes(&self.character_archetypes)?,
    })
  }
}

/// `POST /personas/`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<Json<Persona>, ApiError>
where
  S: DivinationStore + 'static,
{
  let input = body.validate()?;
  let persona = state
    .store
    .create_persona(user, input)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(persona))
}

// ─── List / search ────────────────────────────────────────────────────────────

/// `GET /personas/`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
) -> Result<Json<Vec<Persona>>, ApiError>
where
  S: DivinationStore + 'static,
{
  let personas = state.store.list_personas(user).await.map_err(ApiError::store)?;
  Ok(Json(personas))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub name:  String,
  #[serde(default)]
  pub fuzzy: bool,
}

/// `GET /personas/search?name=<text>[&fuzzy=true]`
///
/// Exact search returns at most one persona.
pub async fn search<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<Persona>>, ApiError>
where
  S: DivinationStore + 'static,
{
  let found = if params.fuzzy {
    state.store.search_personas(user, &params.name).await
  } else {
    state
      .store
      .find_persona_by_name(user, &params.name)
      .await
      .map(|p| p.into_iter().collect::<Vec<_>>())
  }
  .map_err(ApiError::store)?;
  Ok(Json(found))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /personas/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<Persona>, ApiError>
where
  S: DivinationStore + 'static,
{
  let persona = state
    .store
    .get_persona(user, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("persona not found: {id}")))?;
  Ok(Json(persona))
}

/// `GET /personas/:id/stats`
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<PersonaStats>, ApiError>
where
  S: DivinationStore + 'static,
{
  let stats = state.store.persona_stats(user, id).await.map_err(ApiError::store)?;
  Ok(Json(stats))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub display_name:         Option<String>,
  pub description:          Option<String>,
  pub birth_date:           Option<String>,
  pub birth_time:           Option<String>,
  pub birth_location:       Option<String>,
  pub gender:               Option<String>,
  pub character_archetypes: Option<Vec<String>>,
}

impl UpdateBody {
  fn validate(self) -> Result<PersonaPatch, ApiError> {
    Ok(PersonaPatch {
      display_name:         self
        .display_name
        .as_deref()
        .map(validate::display_name)
        .transpose()?,
      description:          self
        .description
        .as_deref()
        .map(validate::description)
        .transpose()?,
      birth_date:           self.birth_date,
      birth_time:           self.birth_time,
      birth_location:       self.birth_location,
      gender:               self.gender,
      character_archetypes: self
        .character_archetypes
        .as_deref()
        .map(validate::archetypes)
        .transpose()?,
    })
  }
}

/// `PUT /personas/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(id): ApiPath<i64>,
  ApiJson(body): ApiJson<UpdateBody>,
) -> Result<Json<Persona>, ApiError>
where
  S: DivinationStore + 'static,
{
  let patch = body.validate()?;
  let persona = state
    .store
    .update_persona(user, id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(persona))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /personas/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: DivinationStore + 'static,
{
  state.store.delete_persona(user, id).await.map_err(ApiError::store)?;
  Ok(Json(json!({
    "message": format!("persona {id} deleted"),
    "success": true,
  })))
}
