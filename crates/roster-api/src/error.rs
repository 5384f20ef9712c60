//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use roster_core::FieldErrors;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Field-level validation failures; the body is the field map itself.
  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<roster_core::Error> for ApiError {
  fn from(e: roster_core::Error) -> Self {
    use roster_core::Error as E;
    match e {
      E::InvalidAction(_) => Self::BadRequest(e.to_string()),
      E::BadRequest(m) => Self::BadRequest(m),
      E::Validation(errors) => Self::Validation(errors),
      E::NotFound { .. } => Self::NotFound(e.to_string()),
      E::Store(inner) => Self::Store(inner),
    }
  }
}

impl From<roster_import::Error> for ApiError {
  fn from(e: roster_import::Error) -> Self {
    use roster_import::Error as E;
    match e {
      E::MissingParams | E::InvalidLocation(_) => Self::BadRequest(e.to_string()),
      other => Self::Internal(other.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Validation(errors) => {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
      }
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    if status.is_server_error() {
      tracing::error!(error = %message, "request failed");
    }
    (status, Json(json!({ "error": message }))).into_response()
  }
}
