//! JSON REST API for Augur.
//!
//! Exposes an axum [`Router`] backed by any
//! [`augur_core::store::DivinationStore`]. TLS, CORS and request tracing are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = augur_api::api_router(AppState::new(store, default_user));
//! ```

pub mod batch;
pub mod error;
pub mod extract;
pub mod personas;
pub mod readings;
pub mod system;

use std::sync::Arc;

use augur_core::{UserId, store::DivinationStore};
use axum::{
  Router, middleware,
  routing::{MethodRouter, get},
};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:        Arc<S>,
  /// The user requests act for when they carry no `X-User-Id`.
  pub default_user: UserId,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, default_user: UserId) -> Self {
    Self { store, default_user }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), default_user: self.default_user }
  }
}

/// Register `route` both with and without a trailing slash.
fn slashed<S>(
  router: Router<AppState<S>>,
  path: &str,
  route: MethodRouter<AppState<S>>,
) -> Router<AppState<S>>
where
  S: DivinationStore + 'static,
{
  router.route(path, route.clone()).route(&format!("{path}/"), route)
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into or layered by any parent
/// router regardless of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: DivinationStore + 'static,
{
  let router = Router::new()
    // System
    .route("/", get(system::root))
    .route("/health", get(system::health::<S>))
    .route("/info", get(system::info));

  // Personas
  let router = slashed(
    router,
    "/personas",
    get(personas::list::<S>).post(personas::create::<S>),
  )
  .route("/personas/search", get(personas::search::<S>))
  .route(
    "/personas/{id}",
    get(personas::get_one::<S>)
      .put(personas::update::<S>)
      .delete(personas::delete::<S>),
  )
  .route("/personas/{id}/stats", get(personas::stats::<S>));

  // Readings
  let router = slashed(
    router,
    "/readings",
    get(readings::list::<S>).post(readings::create::<S>),
  )
  .route("/readings/favorites/list", get(readings::favorites::<S>))
  .route("/readings/methods/{method}/list", get(readings::by_method::<S>))
  .route(
    "/readings/{id}",
    get(readings::get_one::<S>)
      .put(readings::update::<S>)
      .delete(readings::delete::<S>),
  )
  .route("/readings/{id}/details", get(readings::details::<S>));

  // Batch
  router
    .route("/batch/readings", axum::routing::post(batch::submit::<S>))
    .route("/batch/summary", get(batch::summary::<S>))
    .route(
      "/batch/personas/{id}/readings/count",
      get(batch::reading_count::<S>),
    )
    .route(
      "/batch/personas/{id}/readings",
      axum::routing::delete(batch::delete_readings::<S>),
    )
    .method_not_allowed_fallback(system::method_not_allowed)
    .fallback(system::not_found)
    .layer(middleware::from_fn(error::stamp_path))
    .with_state(state)
}

#[cfg(test)]
mod tests;
