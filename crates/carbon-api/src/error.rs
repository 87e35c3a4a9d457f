//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use carbon_core::{calc::ValidationError, insights::ExternalServiceError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Import(#[from] carbon_csv::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Insights(#[from] ExternalServiceError),

  #[error("insights service is not configured")]
  InsightsUnavailable,

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<carbon_core::Error> for ApiError {
  fn from(e: carbon_core::Error) -> Self {
    match e {
      carbon_core::Error::OutOfRange { .. } => ApiError::NotFound(e.to_string()),
      carbon_core::Error::Validation(v) => ApiError::Validation(v),
      carbon_core::Error::Store(inner) => ApiError::Store(inner),
    }
  }
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Import(carbon_csv::Error::TooLarge { .. }) => {
        StatusCode::PAYLOAD_TOO_LARGE
      }
      ApiError::Import(carbon_csv::Error::MissingColumns(_)) => {
        StatusCode::UNPROCESSABLE_ENTITY
      }
      ApiError::Import(_) => StatusCode::BAD_REQUEST,
      ApiError::Store(_) | ApiError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
      ApiError::Insights(_) => StatusCode::BAD_GATEWAY,
      ApiError::InsightsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = match &self {
      ApiError::Validation(e) => json!({ "error": e.reason, "field": e.field }),
      ApiError::Import(carbon_csv::Error::MissingColumns(e)) => {
        json!({ "error": self.to_string(), "missing": e.missing })
      }
      _ => json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
