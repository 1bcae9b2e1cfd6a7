//! API error type and its mapping from store failures.

use holmes_core::{Classify, ErrorClass};
use thiserror::Error;

/// An error returned by a boundary operation.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  Validation(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Recover client-class store failures; everything else stays opaque.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    match err.class() {
      ErrorClass::Validation => Self::Validation(err.to_string()),
      ErrorClass::NotFound => Self::NotFound(err.to_string()),
      ErrorClass::Conflict => Self::Conflict(err.to_string()),
      ErrorClass::Consistency => Self::Store(Box::new(err)),
    }
  }

  /// The HTTP status a transport layer should answer with.
  pub fn status_code(&self) -> u16 {
    match self {
      Self::Validation(_) => 400,
      Self::NotFound(_) => 404,
      Self::Conflict(_) => 409,
      Self::Store(_) => 500,
    }
  }
}

impl Classify for ApiError {
  fn class(&self) -> ErrorClass {
    match self {
      Self::Validation(_) => ErrorClass::Validation,
      Self::NotFound(_) => ErrorClass::NotFound,
      Self::Conflict(_) => ErrorClass::Conflict,
      Self::Store(_) => ErrorClass::Consistency,
    }
  }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use holmes_core::Error as CoreError;
  use uuid::Uuid;

  use super::*;

  #[test]
  fn store_failures_keep_their_class() {
    let id = Uuid::new_v4();
    let cases = [
      (CoreError::ReviewNotFound(id), 404),
      (CoreError::AlreadyComplete(id), 409),
      (CoreError::Validation("x".into()), 400),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from_store(err).status_code(), status);
    }

    let broken = serde_json::from_str::<u8>("nope").unwrap_err();
    let err = ApiError::from_store(CoreError::from(broken));
    assert_eq!(err.class(), ErrorClass::Consistency);
    assert_eq!(err.status_code(), 500);
  }
}
