//! Boundary operations for Holmes.
//!
//! Every function takes any [`holmes_core::store::ReviewStore`], accepts
//! identifiers as the raw strings a transport layer would hand over, and
//! returns a serde-serializable view. Routing, auth and transport are the
//! caller's responsibility.
//!
//! # Usage
//!
//! ```rust,ignore
//! let review = holmes_api::reviews::get_review(&store, page, review).await?;
//! println!("{}", serde_json::to_string(&review)?);
//! ```

pub mod error;
pub mod limiters;
pub mod pages;
pub mod reviews;
pub mod workers;

use uuid::Uuid;

pub use error::{ApiError, Result};

/// Parse a UUID handed in by a client. Anything unparsable is `None`, which
/// callers turn into a not-found response.
pub fn parse_uuid(raw: &str) -> Option<Uuid> { Uuid::parse_str(raw).ok() }
