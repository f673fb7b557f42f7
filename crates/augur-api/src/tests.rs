//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use augur_core::store::DivinationStore;
use augur_store_sqlite::SqliteStore;
use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router, extract::USER_ID_HEADER};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  let user = store.ensure_user("testuser").await.unwrap();
  api_router(AppState::new(Arc::new(store), user.id))
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  user: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(user) = user {
    builder = builder.header(&USER_ID_HEADER, user);
  }
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

fn batch_body(reports: Value) -> Value {
  json!({
    "user_name": "Ada",
    "primary_question": "What does the coming year hold?",
    "selected_methods": ["Tarot", "MBTI"],
    "input_data": {
      "primary_question": "What does the coming year hold?",
      "spread_type": "celtic-cross",
      "mbti_type": "ENTP",
    },
    "individual_reports": reports,
    "integrated_report": "Restless curiosity meets a turning wheel of fortune.",
    "character_archetypes": ["Explorer"],
    "total_processing_time": 100,
  })
}

fn assert_envelope(body: &Value, status: u16, path: &str) {
  assert_eq!(body["status_code"], status, "{body}");
  assert_eq!(body["path"], path, "{body}");
  assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()), "{body}");
  assert!(body["timestamp"].is_string(), "{body}");
}

// ── System ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_database() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "healthy");
  assert_eq!(body["services"]["database"], "healthy");
}

#[tokio::test]
async fn info_lists_every_method() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/info", None, None).await;
  assert_eq!(status, StatusCode::OK);
  let methods = body["divination_methods"].as_array().unwrap();
  assert_eq!(methods.len(), 6);
  assert!(methods.iter().any(|m| m["method"] == "MBTI"));
}

#[tokio::test]
async fn unknown_route_uses_envelope() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/nowhere", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_envelope(&body, 404, "/nowhere");
}

#[tokio::test]
async fn wrong_method_uses_envelope() {
  let app = app().await;
  let (status, body) = send(&app, "PATCH", "/personas/1", None, None).await;
  assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
  assert_envelope(&body, 405, "/personas/1");

  let (status, body) = send(&app, "GET", "/batch/readings", None, None).await;
  assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
  assert_envelope(&body, 405, "/batch/readings");
}

// ── Personas ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_persona_is_idempotent_with_or_without_slash() {
  let app = app().await;
  let (status, first) = send(
    &app,
    "POST",
    "/personas/",
    None,
    Some(json!({ "display_name": "  Ada  ", "description": "mathematician" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["display_name"], "Ada");

  let (status, second) = send(
    &app,
    "POST",
    "/personas",
    None,
    Some(json!({ "display_name": "Ada" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(second["id"], first["id"]);

  let (_, listed) = send(&app, "GET", "/personas", None, None).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn symbolic_persona_name_is_rejected() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/personas/",
    None,
    Some(json!({ "display_name": "!!!" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, 400, "/personas/");
}

#[tokio::test]
async fn malformed_json_uses_envelope() {
  let app = app().await;
  let req = Request::builder()
    .method("POST")
    .uri("/personas/")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_envelope(&body, 400, "/personas/");
}

#[tokio::test]
async fn json_without_content_type_is_415() {
  let app = app().await;
  let req = Request::builder()
    .method("POST")
    .uri("/personas/")
    .body(Body::from(json!({ "display_name": "Ada" }).to_string()))
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_envelope(&body, 415, "/personas/");
}

#[tokio::test]
async fn missing_persona_is_404() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/personas/999", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_envelope(&body, 404, "/personas/999");

  let (status, _) = send(&app, "GET", "/personas/abc", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_exact_and_fuzzy() {
  let app = app().await;
  for name in ["Ada Lovelace", "Grace Hopper"] {
    send(&app, "POST", "/personas/", None, Some(json!({ "display_name": name }))).await;
  }

  let (_, exact) = send(&app, "GET", "/personas/search?name=Ada", None, None).await;
  assert!(exact.as_array().unwrap().is_empty());

  let (_, fuzzy) =
    send(&app, "GET", "/personas/search?name=ada&fuzzy=true", None, None).await;
  assert_eq!(fuzzy.as_array().unwrap().len(), 1);
  assert_eq!(fuzzy[0]["display_name"], "Ada Lovelace");
}

#[tokio::test]
async fn rename_onto_existing_name_conflicts() {
  let app = app().await;
  send(&app, "POST", "/personas/", None, Some(json!({ "display_name": "Ada" }))).await;
  let (_, grace) = send(
    &app,
    "POST",
    "/personas/",
    None,
    Some(json!({ "display_name": "Grace" })),
  )
  .await;

  let uri = format!("/personas/{}", grace["id"]);
  let (status, body) =
    send(&app, "PUT", &uri, None, Some(json!({ "display_name": "Ada" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_envelope(&body, 409, &uri);

  let (status, body) = send(
    &app,
    "PUT",
    &uri,
    None,
    Some(json!({ "character_archetypes": [" Sage ", "", "Rebel"] })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["display_name"], "Grace");
  assert_eq!(body["character_archetypes"], json!(["Sage", "Rebel"]));
}

// ── Caller identity ─────────────────────────────────────────────────────────

#[tokio::test]
async fn user_header_scopes_requests() {
  let app = app().await;
  let (_, persona) = send(
    &app,
    "POST",
    "/personas/",
    None,
    Some(json!({ "display_name": "Ada" })),
  )
  .await;
  let uri = format!("/personas/{}", persona["id"]);

  // The default user is id 1; nobody else can see its personas.
  let (status, _) = send(&app, "GET", &uri, Some("1"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(&app, "GET", &uri, Some("2"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = send(&app, "GET", "/personas/", Some("not-a-number"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, 400, "/personas/");
}

// ── Readings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_reading_validates_method() {
  let app = app().await;
  let body = |method: &str| {
    json!({
      "method": method,
      "main_question": "Will it rain tomorrow?",
      "output_text": "The cards say bring an umbrella.",
    })
  };

  let (status, reading) = send(&app, "POST", "/readings/", None, Some(body("Tarot"))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(reading["status"], "completed");
  assert_eq!(reading["ai_model_used"], "gemini-pro");
  assert_eq!(reading["is_favorite"], false);

  let (status, _) = send(&app, "POST", "/readings/", None, Some(body("Runes"))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(&app, "POST", "/readings/", None, Some(body("Integrated"))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_reading_for_unknown_persona_is_404() {
  let app = app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/readings",
    None,
    Some(json!({
      "persona_id": 42,
      "method": "Astrology",
      "main_question": "Where is my north?",
      "output_text": "Your north node sits in Leo.",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reading_feedback_is_validated() {
  let app = app().await;
  let (_, reading) = send(
    &app,
    "POST",
    "/readings/",
    None,
    Some(json!({
      "method": "Palmistry",
      "main_question": "What do my hands say?",
      "output_text": "A long and steady heart line.",
    })),
  )
  .await;
  let uri = format!("/readings/{}", reading["id"]);

  let (status, _) = send(&app, "PUT", &uri, None, Some(json!({ "user_rating": 6 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send(
    &app,
    "PUT",
    &uri,
    None,
    Some(json!({ "user_rating": 5, "is_favorite": true })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user_rating"], 5);

  let (_, favorites) = send(&app, "GET", "/readings/favorites/list", None, None).await;
  assert_eq!(favorites.as_array().unwrap().len(), 1);

  let (status, _) = send(&app, "DELETE", &uri, None, None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(&app, "GET", &uri, None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reading_list_limit_is_bounded() {
  let app = app().await;
  let (status, _) = send(&app, "GET", "/readings/?limit=0", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&app, "GET", "/readings/?limit=101", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&app, "GET", "/readings/?offset=-1", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, body) = send(&app, "GET", "/readings/?limit=100", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(body.as_array().unwrap().is_empty());
}

// ── Batch ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_round_trip() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/batch/readings",
    None,
    Some(batch_body(json!({
      "Tarot": "The Wheel of Fortune turns in your favour.",
      "MBTI": "ENTP: inventive, argumentative, restless.",
    }))),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["success"], true);
  assert_eq!(body["persona"]["display_name"], "Ada");
  assert_eq!(body["individual_readings"].as_array().unwrap().len(), 2);
  assert_eq!(body["individual_readings"][0]["processing_time"], 50);
  assert_eq!(body["integrated_reading"]["method"], "Integrated");

  let persona_id = &body["persona"]["id"];
  let (_, count) = send(
    &app,
    "GET",
    &format!("/batch/personas/{persona_id}/readings/count"),
    None,
    None,
  )
  .await;
  assert_eq!(count["reading_count"], 3);

  let integrated_id = &body["integrated_reading"]["id"];
  let (_, details) = send(
    &app,
    "GET",
    &format!("/readings/{integrated_id}/details"),
    None,
    None,
  )
  .await;
  assert_eq!(details["source_readings"].as_array().unwrap().len(), 2);

  let (_, summary) = send(&app, "GET", "/batch/summary", None, None).await;
  assert_eq!(summary["statistics"]["total_readings"], 3);
  assert_eq!(summary["user_info"]["username"], "testuser");
}

#[tokio::test]
async fn batch_with_bad_method_leaves_nothing_behind() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/batch/readings",
    None,
    Some(json!({
      "user_name": "Ada",
      "primary_question": "What does the coming year hold?",
      "individual_reports": {
        "Tarot": "The Wheel of Fortune turns in your favour.",
        "Foo": "This method does not exist anywhere.",
      },
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, 400, "/batch/readings");

  let (_, personas) = send(&app, "GET", "/personas/", None, None).await;
  assert!(personas.as_array().unwrap().is_empty());
  let (_, readings) = send(&app, "GET", "/readings/", None, None).await;
  assert!(readings.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn batch_accepts_short_reports() {
  let app = app().await;
  let mut body = batch_body(json!({ "Tarot": "...", "MBTI": "..." }));
  body["integrated_report"] = json!("Short.");
  let (status, body) =
    send(&app, "POST", "/batch/readings", None, Some(body)).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["individual_readings"][0]["output_text"], "...");
  assert_eq!(body["integrated_reading"]["output_text"], "Short.");

  let (_, readings) = send(&app, "GET", "/readings/", None, None).await;
  assert_eq!(readings.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn batch_requires_at_least_one_report() {
  let app = app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/batch/readings",
    None,
    Some(batch_body(json!({}))),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn persona_delete_flow() {
  let app = app().await;
  let (_, body) = send(
    &app,
    "POST",
    "/batch/readings",
    None,
    Some(batch_body(json!({
      "Tarot": "The Wheel of Fortune turns in your favour.",
      "MBTI": "ENTP: inventive, argumentative, restless.",
    }))),
  )
  .await;
  let persona_id = &body["persona"]["id"];
  let persona_uri = format!("/personas/{persona_id}");

  let (status, body) = send(&app, "DELETE", &persona_uri, None, None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_envelope(&body, 409, &persona_uri);

  let readings_uri = format!("/batch/personas/{persona_id}/readings");
  let (status, body) = send(&app, "DELETE", &readings_uri, None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["deleted_count"], 3);

  let (status, body) = send(&app, "DELETE", &readings_uri, None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["deleted_count"], 0);

  let (status, body) = send(&app, "DELETE", &persona_uri, None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);
}
