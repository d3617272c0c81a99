//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use marquee_core::Error;
use serde_json::{Value, json};
use thiserror::Error;

use crate::envelope::Envelope;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] Error),

  /// Malformed path, query string or body.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// A failure outside the store, e.g. password hashing or token signing.
  #[error("internal error: {0}")]
  Internal(String),
}

/// Raw text of a 500, attached as a response extension. Only surfaced to
/// clients outside production.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl ApiError {
  pub fn unauthorized(message: impl Into<String>) -> Self {
    Self::Core(Error::Unauthorized(message.into()))
  }

  pub fn forbidden(message: impl Into<String>) -> Self {
    Self::Core(Error::Forbidden(message.into()))
  }

  pub fn store<E: Into<Error>>(e: E) -> Self { Self::Core(e.into()) }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::Core(e) => match e {
        Error::Validation(_)
        | Error::Conflict { .. }
        | Error::Referential { .. }
        | Error::Serialization(_) => StatusCode::BAD_REQUEST,
        Error::NotFound { .. } | Error::UserNotFound(_) => StatusCode::NOT_FOUND,
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn message_and_details(&self) -> (String, Option<Value>) {
    match self {
      ApiError::Core(Error::Validation(errors)) => (
        "validation failed".to_owned(),
        serde_json::to_value(errors).ok(),
      ),
      ApiError::Core(Error::Conflict { message, dependents: Some(n) }) => {
        (message.clone(), Some(json!({ "dependents": n })))
      }
      ApiError::Core(Error::Unauthorized(m) | Error::Forbidden(m)) => (m.clone(), None),
      ApiError::Core(Error::Store(_)) | ApiError::Internal(_) => {
        ("internal server error".to_owned(), None)
      }
      ApiError::BadRequest(m) => (m.clone(), None),
      ApiError::Core(e) => (e.to_string(), None),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let (message, details) = self.message_and_details();
    let mut response = (status, Json(Envelope::<()>::failure(message, details))).into_response();

    if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!(error = %self, "request failed");
      response.extensions_mut().insert(InternalDetail(self.to_string()));
    }
    response
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

#[cfg(test)]
mod tests {
  use marquee_core::{entity::EntityKind, validate::ValidationErrors};
  use uuid::Uuid;

  use super::*;

  #[test]
  fn status_codes() {
    let id = Uuid::new_v4();
    let cases = [
      (Error::NotFound { kind: EntityKind::Genre, id }, StatusCode::NOT_FOUND),
      (Error::conflict("dup"), StatusCode::BAD_REQUEST),
      (Error::Referential { kind: EntityKind::Type, id }, StatusCode::BAD_REQUEST),
      (Error::Validation(ValidationErrors::single("name", "x")), StatusCode::BAD_REQUEST),
      (Error::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
      (Error::Forbidden("no".into()), StatusCode::FORBIDDEN),
      (Error::Store("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status(), status);
    }
  }

  #[test]
  fn store_failures_hide_their_text() {
    let err = ApiError::from(Error::Store("disk on fire".into()));
    let (message, details) = err.message_and_details();
    assert_eq!(message, "internal server error");
    assert!(details.is_none());

    let response = err.into_response();
    let detail = response.extensions().get::<InternalDetail>().unwrap();
    assert!(detail.0.contains("disk on fire"));
  }

  #[test]
  fn guard_conflicts_report_dependents() {
    let err = ApiError::from(Error::Conflict {
      message:    "in use".into(),
      dependents: Some(3),
    });
    let (_, details) = err.message_and_details();
    assert_eq!(details.unwrap()["dependents"], 3);
  }
}
