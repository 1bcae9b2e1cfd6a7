//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that string comparison in SQL is chronological.
//! UUIDs are stored as hyphenated lowercase strings. Fact values are JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use holmes_core::{
  limiter::Limiter,
  page::Page,
  review::{Fact, Review, ReviewState, Violation},
  worker::Worker,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Ledger rows ─────────────────────────────────────────────────────────────

/// Raw strings read from a `facts` row.
pub struct RawFact {
  pub key:        String,
  pub value_json: String,
  pub title:      String,
  pub unit:       String,
}

impl RawFact {
  pub fn into_fact(self) -> Result<Fact> {
    Ok(Fact {
      key:   self.key,
      value: serde_json::from_str(&self.value_json)?,
      title: self.title,
      unit:  self.unit,
    })
  }
}

/// A fact ready to bind into an INSERT.
pub struct EncodedFact {
  pub key:        String,
  pub value_json: String,
  pub title:      String,
  pub unit:       String,
}

impl EncodedFact {
  pub fn new(fact: &Fact) -> Result<Self> {
    Ok(Self {
      key:        fact.key.clone(),
      value_json: serde_json::to_string(&fact.value)?,
      title:      fact.title.clone(),
      unit:       fact.unit.clone(),
    })
  }
}

/// Violations have no encoded fields beyond plain text and an integer, so
/// the same shape serves for reads and writes.
pub type RawViolation = Violation;

// ─── Review rows ─────────────────────────────────────────────────────────────

/// Raw strings read from a `reviews` row joined with its page, plus its
/// ledgers in append order.
pub struct RawReview {
  pub uuid:         String,
  pub page_uuid:    String,
  pub domain:       String,
  pub is_active:    bool,
  pub is_complete:  bool,
  pub created_at:   String,
  pub completed_at: Option<String>,
  pub facts:        Vec<RawFact>,
  pub violations:   Vec<RawViolation>,
}

impl RawReview {
  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:    decode_uuid(&self.uuid)?,
      page_id:      decode_uuid(&self.page_uuid)?,
      domain:       self.domain,
      state:        ReviewState::from_complete_flag(self.is_complete),
      is_active:    self.is_active,
      created_at:   decode_dt(&self.created_at)?,
      completed_at: self.completed_at.as_deref().map(decode_dt).transpose()?,
      facts:        self
        .facts
        .into_iter()
        .map(RawFact::into_fact)
        .collect::<Result<_>>()?,
      violations:   self.violations,
    })
  }
}

// ─── Page rows ───────────────────────────────────────────────────────────────

/// Raw strings read from a `pages` row joined with its last review.
pub struct RawPage {
  pub uuid:             String,
  pub domain:           String,
  pub url:              String,
  pub created_at:       String,
  pub last_review_uuid: Option<String>,
  pub last_review_date: Option<String>,
}

impl RawPage {
  pub fn into_page(self) -> Result<Page> {
    Ok(Page {
      page_id:          decode_uuid(&self.uuid)?,
      domain:           self.domain,
      url:              self.url,
      created_at:       decode_dt(&self.created_at)?,
      last_review_id:   self.last_review_uuid.as_deref().map(decode_uuid).transpose()?,
      last_review_date: self.last_review_date.as_deref().map(decode_dt).transpose()?,
    })
  }
}

// ─── Worker rows ─────────────────────────────────────────────────────────────

/// Raw strings read from a `workers` row joined with its current review.
pub struct RawWorker {
  pub uuid:                String,
  pub last_ping:           String,
  pub current_review_uuid: Option<String>,
}

impl RawWorker {
  pub fn into_worker(self) -> Result<Worker> {
    Ok(Worker {
      worker_id:         decode_uuid(&self.uuid)?,
      last_ping:         decode_dt(&self.last_ping)?,
      current_review_id: self
        .current_review_uuid
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
    })
  }
}

// ─── Limiter rows ────────────────────────────────────────────────────────────

/// Raw strings read from a `limiters` row.
pub struct RawLimiter {
  pub uuid:  String,
  pub url:   String,
  pub value: i64,
}

impl RawLimiter {
  pub fn into_limiter(self) -> Result<Limiter> {
    Ok(Limiter {
      limiter_id: decode_uuid(&self.uuid)?,
      url:        self.url,
      value:      self.value,
    })
  }
}
