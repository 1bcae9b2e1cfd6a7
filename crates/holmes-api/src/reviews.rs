//! Review operations.
//!
//! | Operation | Input | Output |
//! |-----------|-------|--------|
//! | [`get_review`] | page + review UUID strings | [`ReviewView`] |
//! | [`create_review`] | page UUID + raw `{"facts":[..],"violations":[..]}` | [`CreatedReview`] |
//! | [`complete_review`] | page + review UUID strings | `"OK"` |
//! | [`list_last_reviews`] | limit | active reviews, newest completion first |
//!
//! [`open_review`], [`add_fact`] and [`add_violation`] drive the incremental
//! path a worker uses before calling [`complete_review`].

use chrono::{DateTime, SecondsFormat, Utc};
use holmes_core::{
  review::{Fact, Review, ReviewSubmission, Violation},
  store::ReviewStore,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{ApiError, Result, pages::page_id, parse_uuid};

// ─── Views ───────────────────────────────────────────────────────────────────

/// A review with its ledgers and the aggregates derived from them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
  pub uuid:             Uuid,
  pub page:             Uuid,
  pub domain:           String,
  pub is_active:        bool,
  pub is_complete:      bool,
  pub created_date:     DateTime<Utc>,
  pub completed_date:   Option<DateTime<Utc>>,
  pub facts:            Vec<Fact>,
  pub violations:       Vec<Violation>,
  pub violation_points: i64,
  pub violation_count:  usize,
  #[serde(rename = "completedDateISO")]
  pub completed_date_iso: Option<String>,
}

impl From<Review> for ReviewView {
  fn from(r: Review) -> Self {
    Self {
      uuid:               r.review_id,
      page:               r.page_id,
      is_active:          r.is_active,
      is_complete:        r.is_complete(),
      created_date:       r.created_at,
      completed_date:     r.completed_at,
      violation_points:   r.violation_points(),
      violation_count:    r.violation_count(),
      completed_date_iso: r
        .completed_at
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true)),
      domain:             r.domain,
      facts:              r.facts,
      violations:         r.violations,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedReview {
  pub uuid: Uuid,
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

/// Resolve a review that must belong to `page_uuid`.
async fn resolve<S: ReviewStore>(store: &S, page_uuid: &str, review_uuid: &str) -> Result<Review> {
  let not_found = || {
    debug!(review = review_uuid, "review not found");
    ApiError::NotFound(format!("review with uuid of {review_uuid} not found"))
  };

  let (Some(page_id), Some(review_id)) = (parse_uuid(page_uuid), parse_uuid(review_uuid)) else {
    return Err(not_found());
  };
  match store.get_review(review_id).await.map_err(ApiError::from_store)? {
    Some(review) if review.page_id == page_id => Ok(review),
    _ => Err(not_found()),
  }
}

fn review_id(review_uuid: &str) -> Result<Uuid> {
  parse_uuid(review_uuid)
    .ok_or_else(|| ApiError::NotFound(format!("review with uuid of {review_uuid} not found")))
}

// ─── Boundary operations ─────────────────────────────────────────────────────

pub async fn get_review<S: ReviewStore>(
  store: &S,
  page_uuid: &str,
  review_uuid: &str,
) -> Result<ReviewView> {
  Ok(resolve(store, page_uuid, review_uuid).await?.into())
}

/// Record a finished inspection in one step: the review is created, filled
/// from the payload in order, completed and promoted.
pub async fn create_review<S: ReviewStore>(
  store: &S,
  page_uuid: &str,
  raw_payload: &str,
) -> Result<CreatedReview> {
  let page_id = page_id(page_uuid)?;
  let submission: ReviewSubmission = serde_json::from_str(raw_payload)
    .map_err(|e| ApiError::Validation(format!("malformed review payload: {e}")))?;

  let (review, _report) = store
    .submit_review(page_id, submission)
    .await
    .map_err(ApiError::from_store)?;
  Ok(CreatedReview { uuid: review.review_id })
}

pub async fn complete_review<S: ReviewStore>(
  store: &S,
  page_uuid: &str,
  review_uuid: &str,
) -> Result<&'static str> {
  let review = resolve(store, page_uuid, review_uuid).await?;
  if review.is_complete() {
    debug!(review = %review.review_id, "review is already completed");
    return Err(ApiError::Conflict(format!("review with uuid {review_uuid} is already completed")));
  }

  store
    .complete_review(review.review_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok("OK")
}

pub async fn list_last_reviews<S: ReviewStore>(store: &S, limit: usize) -> Result<Vec<ReviewView>> {
  let reviews = store.last_reviews(limit).await.map_err(ApiError::from_store)?;
  Ok(reviews.into_iter().map(ReviewView::from).collect())
}

// ─── Incremental path ────────────────────────────────────────────────────────

/// Open an empty review for a page. It stays inactive until completed.
pub async fn open_review<S: ReviewStore>(store: &S, page_uuid: &str) -> Result<ReviewView> {
  let review = store
    .create_review(page_id(page_uuid)?)
    .await
    .map_err(ApiError::from_store)?;
  Ok(review.into())
}

pub async fn add_fact<S: ReviewStore>(store: &S, review_uuid: &str, fact: Fact) -> Result<Fact> {
  store
    .add_fact(review_id(review_uuid)?, fact)
    .await
    .map_err(ApiError::from_store)
}

pub async fn add_violation<S: ReviewStore>(
  store: &S,
  review_uuid: &str,
  violation: Violation,
) -> Result<Violation> {
  store
    .add_violation(review_id(review_uuid)?, violation)
    .await
    .map_err(ApiError::from_store)
}
