//! `reconcile_daily_reviews`: the page reconciler as a named transactional
//! step.
//!
//! Both lifecycle paths that complete a review (`complete_review` and
//! `submit_review`) call this inside the same transaction that marked the
//! review complete, so the delete/demote/promote sequence commits or rolls
//! back as a unit.

use chrono::{DateTime, Utc};
use holmes_core::reconcile::is_same_day_duplicate;
use rusqlite::{Connection, Row, params, types::Type};
use uuid::Uuid;

/// The just-completed review being promoted.
pub struct Promotion<'a> {
  pub review_row:   i64,
  pub review_id:    Uuid,
  pub page_row:     i64,
  pub completed_at: &'a str,
}

/// What happened to the page's other reviews.
pub struct Reconciled {
  pub deleted: Vec<Uuid>,
  pub demoted: usize,
}

/// Make `promotion` the single active review of its page.
///
/// 1. Delete every other review of the page created at or after
///    `day_start`. Their ledgers go with them; worker references to them are
///    cleared.
/// 2. Demote every surviving sibling.
/// 3. Activate the review and point the page at it.
///
/// Must run inside an open transaction.
pub fn reconcile_daily_reviews(
  conn: &Connection,
  promotion: &Promotion<'_>,
  day_start: DateTime<Utc>,
) -> rusqlite::Result<Reconciled> {
  let siblings = {
    let mut stmt =
      conn.prepare("SELECT id, uuid, created_at FROM reviews WHERE page_id = ?1 AND id != ?2")?;
    stmt
      .query_map(params![promotion.page_row, promotion.review_row], |row| {
        Ok((row.get::<_, i64>(0)?, column_uuid(row, 1)?, column_dt(row, 2)?))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  let mut deleted = Vec::new();
  for (id, uuid, created_at) in siblings {
    if is_same_day_duplicate(promotion.review_id, uuid, created_at, day_start) {
      conn.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
      deleted.push(uuid);
    }
  }

  let demoted = conn.execute(
    "UPDATE reviews SET is_active = 0 WHERE page_id = ?1 AND id != ?2 AND is_active = 1",
    params![promotion.page_row, promotion.review_row],
  )?;

  conn.execute(
    "UPDATE reviews SET is_active = 1 WHERE id = ?1",
    params![promotion.review_row],
  )?;

  conn.execute(
    "UPDATE pages SET last_review_id = ?2, last_review_date = ?3 WHERE id = ?1",
    params![promotion.page_row, promotion.review_row, promotion.completed_at],
  )?;

  Ok(Reconciled { deleted, demoted })
}

fn column_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
  let s: String = row.get(idx)?;
  Uuid::parse_str(&s)
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn column_dt(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
  let s: String = row.get(idx)?;
  DateTime::parse_from_rfc3339(&s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
