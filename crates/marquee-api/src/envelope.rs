//! The `{success, data?, error?, message?}` wrapper around every response.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:   Option<ErrorBody>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<Value>,
}

impl<T> Envelope<T> {
  pub fn success(data: T) -> Self {
    Self { success: true, data: Some(data), error: None, message: None }
  }

  pub fn failure(message: String, details: Option<Value>) -> Self {
    Self {
      success: false,
      data:    None,
      error:   Some(ErrorBody { message, details }),
      message: None,
    }
  }

  /// A successful response that carries only a message.
  pub fn done(message: impl Into<String>) -> Self {
    Self { success: true, data: None, error: None, message: Some(message.into()) }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }
}

/// `200` with a body.
pub type Reply<T> = Result<Json<Envelope<T>>, ApiError>;

/// `201` with a body.
pub type Created<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

pub fn ok<T>(data: T) -> Json<Envelope<T>> { Json(Envelope::success(data)) }

pub fn created<T>(data: T) -> (StatusCode, Json<Envelope<T>>) {
  (StatusCode::CREATED, Json(Envelope::success(data)))
}
