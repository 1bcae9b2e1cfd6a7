//! Error type for `holmes-store-sqlite`.

use holmes_core::{Classify, ErrorClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A lifecycle or lookup failure raised by the domain rules.
  #[error(transparent)]
  Core(#[from] holmes_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Classify for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::Core(e) => e.class(),
      Self::Database(_) | Self::Json(_) | Self::Uuid(_) | Self::DateParse(_) => {
        ErrorClass::Consistency
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
