//! Synchronous row-level helpers.
//!
//! Each takes a plain `&Connection` so it can run either directly on the
//! connection thread or inside an open [`rusqlite::Transaction`] (which
//! derefs to a connection). They return raw rows; decoding into domain types
//! happens after the call returns to async code.

use rusqlite::{Connection, OptionalExtension as _, Row, params};

use holmes_core::review::{Review, Violation};

use crate::encode::{
  EncodedFact, RawFact, RawLimiter, RawPage, RawReview, RawViolation, RawWorker,
  encode_dt, encode_uuid,
};

// ─── Pages ───────────────────────────────────────────────────────────────────

const PAGE_SELECT: &str = "
  SELECT p.uuid, p.domain, p.url, p.created_at, r.uuid, p.last_review_date
  FROM pages p
  LEFT JOIN reviews r ON r.id = p.last_review_id";

fn raw_page(row: &Row<'_>) -> rusqlite::Result<RawPage> {
  Ok(RawPage {
    uuid:             row.get(0)?,
    domain:           row.get(1)?,
    url:              row.get(2)?,
    created_at:       row.get(3)?,
    last_review_uuid: row.get(4)?,
    last_review_date: row.get(5)?,
  })
}

pub fn select_page(conn: &Connection, uuid: &str) -> rusqlite::Result<Option<RawPage>> {
  conn
    .query_row(&format!("{PAGE_SELECT} WHERE p.uuid = ?1"), params![uuid], raw_page)
    .optional()
}

/// Surrogate key of a page.
pub fn page_id(conn: &Connection, uuid: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row("SELECT id FROM pages WHERE uuid = ?1", params![uuid], |r| r.get(0))
    .optional()
}

/// Surrogate key and domain of a page.
pub fn page_domain(conn: &Connection, uuid: &str) -> rusqlite::Result<Option<(i64, String)>> {
  conn
    .query_row(
      "SELECT id, domain FROM pages WHERE uuid = ?1",
      params![uuid],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()
}

pub fn page_url_exists(conn: &Connection, url: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM pages WHERE url = ?1", params![url], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

/// The columns the lifecycle needs to decide a transition.
pub struct ReviewHead {
  pub id:          i64,
  pub page_id:     i64,
  pub is_complete: bool,
}

pub fn review_head(conn: &Connection, uuid: &str) -> rusqlite::Result<Option<ReviewHead>> {
  conn
    .query_row(
      "SELECT id, page_id, is_complete FROM reviews WHERE uuid = ?1",
      params![uuid],
      |row| {
        Ok(ReviewHead {
          id:          row.get(0)?,
          page_id:     row.get(1)?,
          is_complete: row.get(2)?,
        })
      },
    )
    .optional()
}

const REVIEW_SELECT: &str = "
  SELECT r.id, r.uuid, p.uuid, r.domain, r.is_active, r.is_complete,
         r.created_at, r.completed_at
  FROM reviews r
  JOIN pages p ON p.id = r.page_id";

fn raw_review(row: &Row<'_>) -> rusqlite::Result<(i64, RawReview)> {
  Ok((row.get(0)?, RawReview {
    uuid:         row.get(1)?,
    page_uuid:    row.get(2)?,
    domain:       row.get(3)?,
    is_active:    row.get(4)?,
    is_complete:  row.get(5)?,
    created_at:   row.get(6)?,
    completed_at: row.get(7)?,
    facts:        Vec::new(),
    violations:   Vec::new(),
  }))
}

/// Run a review query and attach each review's ledgers.
fn reviews_where(
  conn: &Connection,
  clause: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<RawReview>> {
  let mut stmt = conn.prepare(&format!("{REVIEW_SELECT} {clause}"))?;
  let heads = stmt
    .query_map(params, raw_review)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  heads
    .into_iter()
    .map(|(id, mut raw)| {
      raw.facts = facts_of(conn, id)?;
      raw.violations = violations_of(conn, id)?;
      Ok::<_, rusqlite::Error>(raw)
    })
    .collect()
}

pub fn select_review(conn: &Connection, uuid: &str) -> rusqlite::Result<Option<RawReview>> {
  Ok(reviews_where(conn, "WHERE r.uuid = ?1", params![uuid])?.pop())
}

pub fn reviews_of_page(conn: &Connection, page_id: i64) -> rusqlite::Result<Vec<RawReview>> {
  reviews_where(
    conn,
    "WHERE r.page_id = ?1 ORDER BY r.created_at DESC, r.id DESC",
    params![page_id],
  )
}

pub fn last_active_reviews(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<RawReview>> {
  reviews_where(
    conn,
    "WHERE r.is_active = 1 AND r.is_complete = 1
     ORDER BY r.completed_at DESC, r.id DESC
     LIMIT ?1",
    params![limit],
  )
}

/// Insert a review row. It always starts inactive; activation is the
/// reconciler's job.
pub fn insert_review(conn: &Connection, page_id: i64, review: &Review) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO reviews (uuid, page_id, domain, is_active, is_complete, created_at, completed_at)
     VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)",
    params![
      encode_uuid(review.review_id),
      page_id,
      review.domain,
      review.is_complete(),
      encode_dt(review.created_at),
      review.completed_at.map(encode_dt),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn mark_complete(conn: &Connection, id: i64, completed_at: &str) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE reviews SET is_complete = 1, completed_at = ?2 WHERE id = ?1",
    params![id, completed_at],
  )?;
  Ok(())
}

// ─── Ledgers ─────────────────────────────────────────────────────────────────

fn facts_of(conn: &Connection, review_id: i64) -> rusqlite::Result<Vec<RawFact>> {
  let mut stmt = conn.prepare(
    "SELECT key, value_json, title, unit FROM facts WHERE review_id = ?1 ORDER BY id",
  )?;
  stmt
    .query_map(params![review_id], |row| {
      Ok(RawFact {
        key:        row.get(0)?,
        value_json: row.get(1)?,
        title:      row.get(2)?,
        unit:       row.get(3)?,
      })
    })?
    .collect()
}

fn violations_of(conn: &Connection, review_id: i64) -> rusqlite::Result<Vec<RawViolation>> {
  let mut stmt = conn.prepare(
    "SELECT key, title, description, points FROM violations WHERE review_id = ?1 ORDER BY id",
  )?;
  stmt
    .query_map(params![review_id], |row| {
      Ok(Violation {
        key:         row.get(0)?,
        title:       row.get(1)?,
        description: row.get(2)?,
        points:      row.get(3)?,
      })
    })?
    .collect()
}

pub fn insert_fact(conn: &Connection, review_id: i64, fact: &EncodedFact) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO facts (review_id, key, value_json, title, unit) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![review_id, fact.key, fact.value_json, fact.title, fact.unit],
  )?;
  Ok(())
}

pub fn insert_violation(
  conn: &Connection,
  review_id: i64,
  violation: &Violation,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO violations (review_id, key, title, description, points)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      review_id,
      violation.key,
      violation.title,
      violation.description,
      violation.points,
    ],
  )?;
  Ok(())
}

// ─── Workers ─────────────────────────────────────────────────────────────────

const WORKER_SELECT: &str = "
  SELECT w.uuid, w.last_ping, r.uuid
  FROM workers w
  LEFT JOIN reviews r ON r.id = w.current_review_id";

fn raw_worker(row: &Row<'_>) -> rusqlite::Result<RawWorker> {
  Ok(RawWorker {
    uuid:                row.get(0)?,
    last_ping:           row.get(1)?,
    current_review_uuid: row.get(2)?,
  })
}

pub fn select_worker(conn: &Connection, uuid: &str) -> rusqlite::Result<Option<RawWorker>> {
  conn
    .query_row(&format!("{WORKER_SELECT} WHERE w.uuid = ?1"), params![uuid], raw_worker)
    .optional()
}

pub fn all_workers(conn: &Connection) -> rusqlite::Result<Vec<RawWorker>> {
  let mut stmt = conn.prepare(&format!("{WORKER_SELECT} ORDER BY w.last_ping DESC"))?;
  stmt.query_map([], raw_worker)?.collect()
}

// ─── Limiters ────────────────────────────────────────────────────────────────

fn raw_limiter(row: &Row<'_>) -> rusqlite::Result<RawLimiter> {
  Ok(RawLimiter {
    uuid:  row.get(0)?,
    url:   row.get(1)?,
    value: row.get(2)?,
  })
}

pub fn select_limiter_by_url(conn: &Connection, url: &str) -> rusqlite::Result<Option<RawLimiter>> {
  conn
    .query_row(
      "SELECT uuid, url, value FROM limiters WHERE url = ?1",
      params![url],
      raw_limiter,
    )
    .optional()
}

pub fn all_limiters(conn: &Connection) -> rusqlite::Result<Vec<RawLimiter>> {
  let mut stmt = conn.prepare("SELECT uuid, url, value FROM limiters ORDER BY id")?;
  stmt.query_map([], raw_limiter)?.collect()
}
