//! Error types for `holmes-core`.

use strum::Display;
use thiserror::Error;
use uuid::Uuid;

/// The failure classes every layer maps its errors onto.
///
/// The boundary layer recovers `Validation`, `NotFound` and `Conflict` into
/// client-facing responses. `Consistency` failures abort the enclosing
/// transaction and fail the current request only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
  Validation,
  NotFound,
  Conflict,
  Consistency,
}

/// Maps an error onto its [`ErrorClass`].
pub trait Classify {
  fn class(&self) -> ErrorClass;
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("page not found: {0}")]
  PageNotFound(Uuid),

  #[error("a page is already registered for {0}")]
  DuplicatePage(String),

  #[error("review not found: {0}")]
  ReviewNotFound(Uuid),

  #[error("worker not found: {0}")]
  WorkerNotFound(Uuid),

  #[error("review {0} is already complete")]
  AlreadyComplete(Uuid),

  #[error("review {0} is complete and can no longer be modified")]
  StaleReview(Uuid),

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Classify for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::PageNotFound(_) | Self::ReviewNotFound(_) | Self::WorkerNotFound(_) => {
        ErrorClass::NotFound
      }
      Self::DuplicatePage(_) | Self::AlreadyComplete(_) | Self::StaleReview(_) => {
        ErrorClass::Conflict
      }
      Self::Validation(_) => ErrorClass::Validation,
      Self::Serialization(_) => ErrorClass::Consistency,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
