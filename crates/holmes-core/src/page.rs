//! Monitored pages and the pointer to their authoritative review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monitored web page.
///
/// `last_review_id` is a non-owning pointer: reviews are owned by the page's
/// review collection, and the pointer names whichever one is currently
/// active. `last_review_date` mirrors that review's completion time and is
/// only ever written together with the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  pub page_id:          Uuid,
  pub domain:           String,
  pub url:              String,
  pub created_at:       DateTime<Utc>,
  pub last_review_id:   Option<Uuid>,
  pub last_review_date: Option<DateTime<Utc>>,
}

impl Page {
  /// A freshly registered page with no reviews yet.
  pub fn new(domain: String, url: String, now: DateTime<Utc>) -> Self {
    Self {
      page_id: Uuid::new_v4(),
      domain,
      url,
      created_at: now,
      last_review_id: None,
      last_review_date: None,
    }
  }
}
