//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Store outcomes collapse into the core taxonomy first, then map to HTTP:
//! validation failures are 400s with a display-safe message list, missing
//! records are 404s, version conflicts are 409s, and only genuine backend
//! faults become 500s.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use schemata_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// A schema or payload failed validation; carries the gateway's messages.
  #[error("{error}")]
  Invalid {
    error:    String,
    messages: Vec<String>,
  },

  #[error("store error: {0}")]
  Store(Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a store error onto the HTTP taxonomy via the core error type.
  pub fn from_store<E: Into<CoreError>>(err: E) -> Self {
    match err.into() {
      e @ CoreError::NotFound { .. } => ApiError::NotFound(e.to_string()),
      e @ (CoreError::DuplicateVersion { .. } | CoreError::ConflictRetry { .. }) => {
        ApiError::Conflict(e.to_string())
      }
      e @ (CoreError::InvalidSchema(_)
      | CoreError::InvalidData(_)
      | CoreError::EmptyDocument
      | CoreError::MissingSchemaKeyword
      | CoreError::UnsupportedSchemaVersion(_)
      | CoreError::SchemaIsNull
      | CoreError::DataIsNull
      | CoreError::VersionParse(_)) => ApiError::Invalid {
        error:    e.to_string(),
        messages: e.messages(),
      },
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Conflict(m) => {
        (StatusCode::CONFLICT, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Invalid { error, messages } => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "messages": messages })),
      )
        .into_response(),
      ApiError::Store(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
      )
        .into_response(),
    }
  }
}
