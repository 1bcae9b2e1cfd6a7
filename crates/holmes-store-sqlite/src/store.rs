//! [`SqliteStore`], the SQLite implementation of [`ReviewStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use rusqlite::{TransactionBehavior, params};
use tracing::info;
use uuid::Uuid;

use holmes_core::{
  Error as CoreError,
  clock::{Clock, SystemClock},
  limiter::{Limiter, LimiterRule},
  page::Page,
  reconcile::{ReconcileReport, local_day_start},
  review::{Fact, Review, ReviewState, ReviewSubmission, Violation},
  store::ReviewStore,
  worker::Worker,
};

use crate::{
  Error, Result,
  encode::{EncodedFact, RawLimiter, RawPage, RawReview, RawWorker, encode_dt, encode_uuid},
  query,
  reconcile::{Promotion, Reconciled, reconcile_daily_reviews},
  schema::SCHEMA,
};

/// Result of a unit of work on the connection thread. The outer layer is the
/// database call; the inner layer is a domain rule that refused the
/// operation, in which case the transaction is dropped and rolls back.
type Tx<T> = tokio_rusqlite::Result<holmes_core::Result<T>>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Holmes review store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// share one connection thread, so writes are serialised.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  clock: Arc<dyn Clock>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, e.g. for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Replace the wall clock, e.g. with a [`holmes_core::clock::ManualClock`].
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, clock: Arc::new(SystemClock) })
  }

  fn now(&self) -> DateTime<Utc> { self.clock.now() }

  /// Run `f` on the connection thread, queued behind any earlier calls.
  #[cfg(test)]
  pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  #[cfg(test)]
  pub(crate) async fn table_len(&self, table: &'static str) -> Result<i64> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        })
        .await?,
    )
  }

  /// Mark `review_id` complete and reconcile its page, in one transaction.
  ///
  /// The completion time is read on the connection thread once the write
  /// lock is held, so completion times follow commit order.
  async fn complete_in_tx(
    &self,
    review_id: Uuid,
  ) -> Result<(RawReview, Reconciled, DateTime<Utc>)> {
    let clock = Arc::clone(&self.clock);
    let uuid_str = encode_uuid(review_id);

    let (raw, reconciled, day_start) = self
      .conn
      .call(move |conn| -> Tx<(RawReview, Reconciled, DateTime<Utc>)> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(head) = query::review_head(&tx, &uuid_str)? else {
          return Ok(Err(CoreError::ReviewNotFound(review_id)));
        };
        if let Err(e) = ReviewState::from_complete_flag(head.is_complete).complete(review_id) {
          return Ok(Err(e));
        }

        let now = clock.now();
        let day_start = local_day_start(now);
        let completed_at = encode_dt(now);

        query::mark_complete(&tx, head.id, &completed_at)?;
        let reconciled = reconcile_daily_reviews(
          &tx,
          &Promotion {
            review_row:   head.id,
            review_id,
            page_row:     head.page_id,
            completed_at: &completed_at,
          },
          day_start,
        )?;
        let raw = query::select_review(&tx, &uuid_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        tx.commit()?;
        Ok(Ok((raw, reconciled, day_start)))
      })
      .await??;

    Ok((raw, reconciled, day_start))
  }

  /// Persist an open in-memory review, complete it and reconcile its page,
  /// in one transaction. Completion is stamped the same way as in
  /// [`Self::complete_in_tx`].
  async fn insert_completed_in_tx(
    &self,
    mut review: Review,
  ) -> Result<(RawReview, Reconciled, DateTime<Utc>)> {
    let clock = Arc::clone(&self.clock);
    let review_id = review.review_id;
    let page_id = review.page_id;
    let page_str = encode_uuid(page_id);
    let uuid_str = encode_uuid(review_id);
    let facts = review
      .facts
      .iter()
      .map(EncodedFact::new)
      .collect::<Result<Vec<_>>>()?;

    let (raw, reconciled, day_start) = self
      .conn
      .call(move |conn| -> Tx<(RawReview, Reconciled, DateTime<Utc>)> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(page_row) = query::page_id(&tx, &page_str)? else {
          return Ok(Err(CoreError::PageNotFound(page_id)));
        };

        let now = clock.now();
        if let Err(e) = review.complete(now) {
          return Ok(Err(e));
        }
        let day_start = local_day_start(now);
        let completed_at = encode_dt(now);

        let review_row = query::insert_review(&tx, page_row, &review)?;
        for fact in &facts {
          query::insert_fact(&tx, review_row, fact)?;
        }
        for violation in &review.violations {
          query::insert_violation(&tx, review_row, violation)?;
        }

        let reconciled = reconcile_daily_reviews(
          &tx,
          &Promotion { review_row, review_id, page_row, completed_at: &completed_at },
          day_start,
        )?;
        let raw = query::select_review(&tx, &uuid_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        tx.commit()?;
        Ok(Ok((raw, reconciled, day_start)))
      })
      .await??;

    Ok((raw, reconciled, day_start))
  }
}

/// Decode a promoted review and log what reconciliation did.
fn promoted(
  raw: RawReview,
  reconciled: Reconciled,
  day_start: DateTime<Utc>,
) -> Result<(Review, ReconcileReport)> {
  let review = raw.into_review()?;
  let report = ReconcileReport {
    review_id: review.review_id,
    page_id: review.page_id,
    day_start,
    deleted: reconciled.deleted,
    demoted: reconciled.demoted,
  };

  info!(
    review = %report.review_id,
    page = %report.page_id,
    deleted = report.deleted.len(),
    demoted = report.demoted,
    "review promoted to active"
  );
  Ok((review, report))
}

// ─── ReviewStore impl ────────────────────────────────────────────────────────

impl ReviewStore for SqliteStore {
  type Error = Error;

  // ── Pages ─────────────────────────────────────────────────────────────────

  async fn add_page(&self, domain: String, url: String) -> Result<Page> {
    if domain.trim().is_empty() || url.trim().is_empty() {
      return Err(CoreError::Validation("page domain and url are required".into()).into());
    }

    let page = Page::new(domain, url, self.now());
    let uuid_str = encode_uuid(page.page_id);
    let at_str = encode_dt(page.created_at);
    let domain = page.domain.clone();
    let url = page.url.clone();

    self
      .conn
      .call(move |conn| -> Tx<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if query::page_url_exists(&tx, &url)? {
          return Ok(Err(CoreError::DuplicatePage(url)));
        }
        tx.execute(
          "INSERT INTO pages (uuid, domain, url, created_at) VALUES (?1, ?2, ?3, ?4)",
          params![uuid_str, domain, url, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(page)
  }

  async fn get_page(&self, page_id: Uuid) -> Result<Option<Page>> {
    let uuid_str = encode_uuid(page_id);
    let raw: Option<RawPage> = self
      .conn
      .call(move |conn| Ok(query::select_page(conn, &uuid_str)?))
      .await?;
    raw.map(RawPage::into_page).transpose()
  }

  async fn reviews_for_page(&self, page_id: Uuid) -> Result<Vec<Review>> {
    let uuid_str = encode_uuid(page_id);
    let raws = self
      .conn
      .call(move |conn| -> Tx<Vec<RawReview>> {
        let Some(page_row) = query::page_id(conn, &uuid_str)? else {
          return Ok(Err(CoreError::PageNotFound(page_id)));
        };
        Ok(Ok(query::reviews_of_page(conn, page_row)?))
      })
      .await??;
    raws.into_iter().map(RawReview::into_review).collect()
  }

  // ── Review lifecycle ──────────────────────────────────────────────────────

  async fn create_review(&self, page_id: Uuid) -> Result<Review> {
    let now = self.now();
    let uuid_str = encode_uuid(page_id);

    let review = self
      .conn
      .call(move |conn| -> Tx<Review> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some((page_row, domain)) = query::page_domain(&tx, &uuid_str)? else {
          return Ok(Err(CoreError::PageNotFound(page_id)));
        };

        let review = Review::open(page_id, domain, now);
        query::insert_review(&tx, page_row, &review)?;
        tx.commit()?;
        Ok(Ok(review))
      })
      .await??;

    Ok(review)
  }

  async fn add_fact(&self, review_id: Uuid, fact: Fact) -> Result<Fact> {
    let encoded = EncodedFact::new(&fact)?;
    let uuid_str = encode_uuid(review_id);

    self
      .conn
      .call(move |conn| -> Tx<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(head) = query::review_head(&tx, &uuid_str)? else {
          return Ok(Err(CoreError::ReviewNotFound(review_id)));
        };
        if let Err(e) = ReviewState::from_complete_flag(head.is_complete).ensure_open(review_id) {
          return Ok(Err(e));
        }
        query::insert_fact(&tx, head.id, &encoded)?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(fact)
  }

  async fn add_violation(&self, review_id: Uuid, violation: Violation) -> Result<Violation> {
    let uuid_str = encode_uuid(review_id);
    let row = violation.clone();

    self
      .conn
      .call(move |conn| -> Tx<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(head) = query::review_head(&tx, &uuid_str)? else {
          return Ok(Err(CoreError::ReviewNotFound(review_id)));
        };
        if let Err(e) = ReviewState::from_complete_flag(head.is_complete).ensure_open(review_id) {
          return Ok(Err(e));
        }
        query::insert_violation(&tx, head.id, &row)?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(violation)
  }

  async fn complete_review(&self, review_id: Uuid) -> Result<(Review, ReconcileReport)> {
    let (raw, reconciled, day_start) = self.complete_in_tx(review_id).await?;
    promoted(raw, reconciled, day_start)
  }

  async fn submit_review(
    &self,
    page_id: Uuid,
    submission: ReviewSubmission,
  ) -> Result<(Review, ReconcileReport)> {
    let page = self
      .get_page(page_id)
      .await?
      .ok_or(CoreError::PageNotFound(page_id))?;

    let mut review = Review::open(page.page_id, page.domain, self.now());
    for fact in submission.facts {
      review.add_fact(fact)?;
    }
    for violation in submission.violations {
      review.add_violation(violation)?;
    }

    let (raw, reconciled, day_start) = self.insert_completed_in_tx(review).await?;
    promoted(raw, reconciled, day_start)
  }

  // ── Review reads ──────────────────────────────────────────────────────────

  async fn get_review(&self, review_id: Uuid) -> Result<Option<Review>> {
    let uuid_str = encode_uuid(review_id);
    let raw = self
      .conn
      .call(move |conn| Ok(query::select_review(conn, &uuid_str)?))
      .await?;
    raw.map(RawReview::into_review).transpose()
  }

  async fn last_reviews(&self, limit: usize) -> Result<Vec<Review>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let raws = self
      .conn
      .call(move |conn| Ok(query::last_active_reviews(conn, limit)?))
      .await?;
    raws.into_iter().map(RawReview::into_review).collect()
  }

  // ── Limiters ──────────────────────────────────────────────────────────────

  async fn list_limiters(&self) -> Result<Vec<Limiter>> {
    let raws = self
      .conn
      .call(|conn| Ok(query::all_limiters(conn)?))
      .await?;
    raws.into_iter().map(RawLimiter::into_limiter).collect()
  }

  async fn add_or_update_limiter(&self, rule: LimiterRule) -> Result<Limiter> {
    let new_uuid = encode_uuid(Uuid::new_v4());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match query::select_limiter_by_url(&tx, &rule.url)? {
          Some(_) => {
            tx.execute(
              "UPDATE limiters SET value = ?2 WHERE url = ?1",
              params![rule.url, rule.value],
            )?;
          }
          None => {
            tx.execute(
              "INSERT INTO limiters (uuid, url, value) VALUES (?1, ?2, ?3)",
              params![new_uuid, rule.url, rule.value],
            )?;
          }
        }
        let raw = query::select_limiter_by_url(&tx, &rule.url)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_limiter()
  }

  // ── Workers ───────────────────────────────────────────────────────────────

  async fn ping_worker(&self, worker_id: Uuid) -> Result<Worker> {
    let uuid_str = encode_uuid(worker_id);
    let at_str = encode_dt(self.now());

    let raw: RawWorker = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "INSERT INTO workers (uuid, last_ping) VALUES (?1, ?2)
           ON CONFLICT(uuid) DO UPDATE SET last_ping = excluded.last_ping",
          params![uuid_str, at_str],
        )?;
        let raw = query::select_worker(&tx, &uuid_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_worker()
  }

  async fn assign_worker_review(
    &self,
    worker_id: Uuid,
    review_id: Option<Uuid>,
  ) -> Result<Worker> {
    let worker_str = encode_uuid(worker_id);

    let raw = self
      .conn
      .call(move |conn| -> Tx<RawWorker> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if query::select_worker(&tx, &worker_str)?.is_none() {
          return Ok(Err(CoreError::WorkerNotFound(worker_id)));
        }

        let review_row = match review_id {
          Some(id) => match query::review_head(&tx, &encode_uuid(id))? {
            Some(head) => Some(head.id),
            None => return Ok(Err(CoreError::ReviewNotFound(id))),
          },
          None => None,
        };

        tx.execute(
          "UPDATE workers SET current_review_id = ?2 WHERE uuid = ?1",
          params![worker_str, review_row],
        )?;
        let raw = query::select_worker(&tx, &worker_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await??;

    raw.into_worker()
  }

  async fn get_worker(&self, worker_id: Uuid) -> Result<Option<Worker>> {
    let uuid_str = encode_uuid(worker_id);
    let raw = self
      .conn
      .call(move |conn| Ok(query::select_worker(conn, &uuid_str)?))
      .await?;
    raw.map(RawWorker::into_worker).transpose()
  }

  async fn list_workers(&self) -> Result<Vec<Worker>> {
    let raws = self
      .conn
      .call(|conn| Ok(query::all_workers(conn)?))
      .await?;
    raws.into_iter().map(RawWorker::into_worker).collect()
  }
}
