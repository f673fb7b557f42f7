//! Request extractors whose rejections use the API error envelope, and the
//! caller-identity extractor.

use axum::{
  extract::{FromRequest, FromRequestParts},
  http::{HeaderName, request::Parts},
};
use augur_core::{UserId, store::DivinationStore};

use crate::{AppState, error::ApiError};

/// `axum::Json` with rejections routed through [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with rejections routed through [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `axum::extract::Path` with rejections routed through [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Header carrying the caller's user id.
pub static USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// The user a request acts on behalf of.
///
/// Read from `X-User-Id`; absent means the configured default user. This is
/// an identity hint, not authentication.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub UserId);

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: DivinationStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Some(raw) = parts.headers.get(&USER_ID_HEADER) else {
      return Ok(Self(state.default_user));
    };
    raw
      .to_str()
      .ok()
      .and_then(|s| s.trim().parse::<i64>().ok())
      .map(|id| Self(UserId(id)))
      .ok_or_else(|| {
        ApiError::BadRequest(format!("{USER_ID_HEADER} must be an integer user id"))
      })
  }
}
