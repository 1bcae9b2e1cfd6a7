//! The `ReviewStore` trait.
//!
//! Implemented by storage backends (e.g. `holmes-store-sqlite`). The boundary
//! layer (`holmes-api`) depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  limiter::{Limiter, LimiterRule},
  page::Page,
  reconcile::ReconcileReport,
  review::{Fact, Review, ReviewSubmission, Violation},
  worker::Worker,
};

/// Abstraction over a transactional Holmes store.
///
/// Every method is one atomic unit of work: on error nothing it did is
/// visible to later readers. In particular, completion and reconciliation of
/// a review commit together, so no reader ever sees two active reviews for
/// one page.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded runtimes.
pub trait ReviewStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Pages ─────────────────────────────────────────────────────────────

  /// Register a page. Fails if `url` is already registered.
  fn add_page(
    &self,
    domain: String,
    url: String,
  ) -> impl Future<Output = Result<Page, Self::Error>> + Send + '_;

  /// Retrieve a page by UUID. Returns `None` if not found.
  fn get_page(
    &self,
    page_id: Uuid,
  ) -> impl Future<Output = Result<Option<Page>, Self::Error>> + Send + '_;

  /// Every review of a page, newest first, active or not.
  fn reviews_for_page(
    &self,
    page_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  // ── Review lifecycle ──────────────────────────────────────────────────

  /// Open a new, inactive review for a page.
  fn create_review(
    &self,
    page_id: Uuid,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  /// Append a fact. Fails with a conflict once the review is complete.
  fn add_fact(
    &self,
    review_id: Uuid,
    fact: Fact,
  ) -> impl Future<Output = Result<Fact, Self::Error>> + Send + '_;

  /// Append a violation. Fails with a conflict once the review is complete.
  fn add_violation(
    &self,
    review_id: Uuid,
    violation: Violation,
  ) -> impl Future<Output = Result<Violation, Self::Error>> + Send + '_;

  /// Complete an open review and promote it to be the page's active review.
  fn complete_review(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<(Review, ReconcileReport), Self::Error>> + Send + '_;

  /// Create, populate, complete and promote a review in one step.
  fn submit_review(
    &self,
    page_id: Uuid,
    submission: ReviewSubmission,
  ) -> impl Future<Output = Result<(Review, ReconcileReport), Self::Error>> + Send + '_;

  // ── Review reads ──────────────────────────────────────────────────────

  /// Retrieve a review with its ledgers. Returns `None` if not found.
  fn get_review(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + '_;

  /// The most recently completed active reviews across all pages.
  fn last_reviews(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  // ── Limiters ──────────────────────────────────────────────────────────

  fn list_limiters(
    &self,
  ) -> impl Future<Output = Result<Vec<Limiter>, Self::Error>> + Send + '_;

  /// Insert the rule for `rule.url`, or update its value if one exists.
  fn add_or_update_limiter(
    &self,
    rule: LimiterRule,
  ) -> impl Future<Output = Result<Limiter, Self::Error>> + Send + '_;

  // ── Workers ───────────────────────────────────────────────────────────

  /// Register the worker on first sight; refresh `last_ping` otherwise.
  fn ping_worker(
    &self,
    worker_id: Uuid,
  ) -> impl Future<Output = Result<Worker, Self::Error>> + Send + '_;

  /// Point the worker at a review, or clear its reference with `None`.
  fn assign_worker_review(
    &self,
    worker_id: Uuid,
    review_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Worker, Self::Error>> + Send + '_;

  fn get_worker(
    &self,
    worker_id: Uuid,
  ) -> impl Future<Output = Result<Option<Worker>, Self::Error>> + Send + '_;

  fn list_workers(
    &self,
  ) -> impl Future<Output = Result<Vec<Worker>, Self::Error>> + Send + '_;
}
