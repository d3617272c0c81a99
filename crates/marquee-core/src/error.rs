//! Error types for `marquee-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{entity::EntityKind, validate::ValidationErrors};

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("{kind} not found: {id}")]
  NotFound { kind: EntityKind, id: Uuid },

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  /// Duplicate natural key, or a delete blocked by dependent media.
  #[error("{message}")]
  Conflict {
    message:    String,
    dependents: Option<u64>,
  },

  #[error("referenced {kind} does not exist: {id}")]
  Referential { kind: EntityKind, id: Uuid },

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn conflict(message: impl Into<String>) -> Self {
    Self::Conflict { message: message.into(), dependents: None }
  }
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Self::Validation(errors) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
