//! Workers: external inspection processes and the review each one owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inspection process known to the registry.
///
/// `current_review_id` is a non-owning reference; it becomes `None` if the
/// review is deleted by same-day reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
  pub worker_id:         Uuid,
  pub last_ping:         DateTime<Utc>,
  pub current_review_id: Option<Uuid>,
}
