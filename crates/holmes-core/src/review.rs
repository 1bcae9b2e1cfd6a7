//! Reviews, one inspection pass over a page each, and their ledgers.
//!
//! A review moves through a single transition, `Open` → `Complete`. While
//! open it accepts facts and violations; once complete its ledgers are frozen.
//! Whether a review is *active* is a separate axis owned by the page
//! reconciler (see [`crate::reconcile`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Ledger entries ──────────────────────────────────────────────────────────

/// A measured property of the page, e.g. total page size or request count.
/// Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
  pub key:   String,
  /// Arbitrary JSON; numbers, strings and lists all occur in practice.
  pub value: serde_json::Value,
  pub title: String,
  pub unit:  String,
}

/// A rule the page breaks, weighted by `points`.
/// Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
  pub key:         String,
  pub title:       String,
  pub description: String,
  pub points:      i64,
}

/// The ledgers of an inspection result as delivered by a worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSubmission {
  pub facts:      Vec<Fact>,
  pub violations: Vec<Violation>,
}

// ─── State machine ───────────────────────────────────────────────────────────

/// Completion state of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
  Open,
  Complete,
}

impl ReviewState {
  /// Decode the persisted `is_complete` flag.
  pub fn from_complete_flag(is_complete: bool) -> Self {
    if is_complete { Self::Complete } else { Self::Open }
  }

  pub fn is_complete(self) -> bool { matches!(self, Self::Complete) }

  /// Guard for ledger appends: only open reviews accept entries.
  pub fn ensure_open(self, review_id: Uuid) -> Result<()> {
    match self {
      Self::Open => Ok(()),
      Self::Complete => Err(Error::StaleReview(review_id)),
    }
  }

  /// The `Open` → `Complete` transition. Completing twice is a conflict.
  pub fn complete(self, review_id: Uuid) -> Result<Self> {
    match self {
      Self::Open => Ok(Self::Complete),
      Self::Complete => Err(Error::AlreadyComplete(review_id)),
    }
  }
}

// ─── Review ──────────────────────────────────────────────────────────────────

/// One inspection pass over a page.
///
/// Violation count and points are always derived from the ledger and never
/// stored on the review itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  pub review_id:    Uuid,
  pub page_id:      Uuid,
  /// Denormalised from the owning page.
  pub domain:       String,
  pub state:        ReviewState,
  pub is_active:    bool,
  pub created_at:   DateTime<Utc>,
  /// Absent until the review completes.
  pub completed_at: Option<DateTime<Utc>>,
  pub facts:        Vec<Fact>,
  pub violations:   Vec<Violation>,
}

impl Review {
  /// Open a new, inactive review for a page.
  pub fn open(page_id: Uuid, domain: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      review_id:    Uuid::new_v4(),
      page_id,
      domain:       domain.into(),
      state:        ReviewState::Open,
      is_active:    false,
      created_at:   now,
      completed_at: None,
      facts:        Vec::new(),
      violations:   Vec::new(),
    }
  }

  pub fn is_complete(&self) -> bool { self.state.is_complete() }

  pub fn add_fact(&mut self, fact: Fact) -> Result<()> {
    self.state.ensure_open(self.review_id)?;
    self.facts.push(fact);
    Ok(())
  }

  pub fn add_violation(&mut self, violation: Violation) -> Result<()> {
    self.state.ensure_open(self.review_id)?;
    self.violations.push(violation);
    Ok(())
  }

  /// Finish the review: it becomes complete and active, and records `now` as
  /// its completion time. On error the review is left untouched.
  pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
    self.state = self.state.complete(self.review_id)?;
    self.is_active = true;
    self.completed_at = Some(now);
    Ok(())
  }

  /// Sum of `points` over the violation ledger, saturating at the bounds of
  /// `i64`.
  pub fn violation_points(&self) -> i64 {
    self
      .violations
      .iter()
      .fold(0i64, |total, v| total.saturating_add(v.points))
  }

  pub fn violation_count(&self) -> usize { self.violations.len() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn open_review(now: DateTime<Utc>) -> Review {
    Review::open(Uuid::new_v4(), "example.com", now)
  }

  fn violation(points: i64) -> Violation {
    Violation {
      key:         "blacklist.domains".into(),
      title:       "Domain blacklist".into(),
      description: "links to a blacklisted domain".into(),
      points,
    }
  }

  fn fact() -> Fact {
    Fact {
      key:   "page.size".into(),
      value: serde_json::json!(32.4),
      title: "Page size".into(),
      unit:  "kb".into(),
    }
  }

  #[test]
  fn new_review_is_open_and_inactive() {
    let review = open_review(Utc::now());
    assert_eq!(review.state, ReviewState::Open);
    assert!(!review.is_active);
    assert!(review.completed_at.is_none());
  }

  #[test]
  fn complete_sets_active_and_completion_time() {
    let created = Utc::now();
    let mut review = open_review(created);
    let done = created + Duration::minutes(3);

    review.complete(done).unwrap();

    assert!(review.is_complete());
    assert!(review.is_active);
    assert_eq!(review.completed_at, Some(done));
  }

  #[test]
  fn completing_twice_conflicts_and_keeps_state() {
    let created = Utc::now();
    let mut review = open_review(created);
    let first = created + Duration::minutes(1);
    review.complete(first).unwrap();

    let err = review.complete(first + Duration::minutes(1)).unwrap_err();
    assert!(matches!(err, Error::AlreadyComplete(id) if id == review.review_id));
    assert_eq!(review.completed_at, Some(first));
  }

  #[test]
  fn ledgers_are_frozen_after_completion() {
    let mut review = open_review(Utc::now());
    review.add_fact(fact()).unwrap();
    review.complete(Utc::now()).unwrap();

    assert!(matches!(review.add_fact(fact()), Err(Error::StaleReview(_))));
    assert!(matches!(
      review.add_violation(violation(1)),
      Err(Error::StaleReview(_))
    ));
    assert_eq!(review.facts.len(), 1);
    assert!(review.violations.is_empty());
  }

  #[test]
  fn violation_aggregates_follow_the_ledger() {
    let mut review = open_review(Utc::now());
    assert_eq!(review.violation_points(), 0);
    assert_eq!(review.violation_count(), 0);

    for points in [5, 10, 0] {
      review.add_violation(violation(points)).unwrap();
    }

    assert_eq!(review.violation_points(), 15);
    assert_eq!(review.violation_count(), 3);
  }

  #[test]
  fn violation_points_saturate_instead_of_overflowing() {
    let mut review = open_review(Utc::now());
    review.add_violation(violation(i64::MAX)).unwrap();
    review.add_violation(violation(1)).unwrap();
    assert_eq!(review.violation_points(), i64::MAX);

    let mut review = open_review(Utc::now());
    review.add_violation(violation(i64::MIN)).unwrap();
    review.add_violation(violation(-1)).unwrap();
    assert_eq!(review.violation_points(), i64::MIN);
  }

  #[test]
  fn submission_parses_worker_payload() {
    let raw = r#"{
      "facts": [{"key": "page.title", "value": "Home", "title": "Title", "unit": "value"}],
      "violations": [{"key": "seo.title", "title": "Long title", "description": "too long", "points": 5}]
    }"#;
    let submission: ReviewSubmission = serde_json::from_str(raw).unwrap();
    assert_eq!(submission.facts[0].value, serde_json::json!("Home"));
    assert_eq!(submission.violations[0].points, 5);
  }
}
