//! Error type for `marquee-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] marquee_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A unique index rejected the write.
  #[error("{0}")]
  Duplicate(String),
}

impl Error {
  /// Classify a failed write, turning unique-index violations into
  /// [`Error::Duplicate`].
  pub(crate) fn on_write(e: tokio_rusqlite::Error, duplicate: impl FnOnce() -> String) -> Self {
    match &e {
      tokio_rusqlite::Error::Rusqlite(inner) if is_unique_violation(inner) => {
        Error::Duplicate(duplicate())
      }
      _ => Error::Database(e),
    }
  }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

impl From<Error> for marquee_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(e) => e,
      Error::Duplicate(message) => marquee_core::Error::conflict(message),
      other => marquee_core::Error::Store(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
