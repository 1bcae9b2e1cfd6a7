//! Per-URL rate thresholds and the external usage counter they are read
//! against.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A rate threshold for one URL prefix. At most one rule exists per URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limiter {
  pub limiter_id: Uuid,
  pub url:        String,
  pub value:      i64,
}

/// A validated upsert request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterRule {
  pub url:   String,
  pub value: i64,
}

impl LimiterRule {
  pub fn new(url: impl Into<String>, value: i64) -> Result<Self> {
    let url = url.into();
    if url.trim().is_empty() {
      return Err(Error::Validation("limiter url must not be empty".into()));
    }
    if value < 0 {
      return Err(Error::Validation(format!(
        "limiter value must not be negative, got {value}"
      )));
    }
    Ok(Self { url, value })
  }
}

/// Counter-service key under which current usage of `url` is tracked.
pub fn usage_key(url: &str) -> String { format!("limit-for-{url}") }

// ─── Usage counter ───────────────────────────────────────────────────────────

/// Read access to the external service counting requests per limiter key.
///
/// Reads carry no ordering guarantee relative to rule upserts.
pub trait UsageCounter: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Current usage for `key`, or `None` if the counter has never been hit.
  fn limit_usage<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send + 'a;
}

/// In-process counter; also used to seed a snapshot of an external one.
#[derive(Debug, Default)]
pub struct MemoryCounter {
  counts: RwLock<HashMap<String, u64>>,
}

impl MemoryCounter {
  pub fn set(&self, key: impl Into<String>, value: u64) {
    self
      .counts
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key.into(), value);
  }

  /// Increment `key` and return the new count.
  pub fn incr(&self, key: &str) -> u64 {
    let mut counts = self.counts.write().unwrap_or_else(PoisonError::into_inner);
    let count = counts.entry(key.to_owned()).or_insert(0);
    *count += 1;
    *count
  }
}

impl FromIterator<(String, u64)> for MemoryCounter {
  fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
    Self { counts: RwLock::new(iter.into_iter().collect()) }
  }
}

impl UsageCounter for MemoryCounter {
  type Error = Infallible;

  async fn limit_usage(&self, key: &str) -> Result<Option<u64>, Infallible> {
    let counts = self.counts.read().unwrap_or_else(PoisonError::into_inner);
    Ok(counts.get(key).copied())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rule_requires_url() {
    assert!(matches!(LimiterRule::new("  ", 10), Err(Error::Validation(_))));
    assert!(matches!(LimiterRule::new("http://a.com", -1), Err(Error::Validation(_))));
    assert_eq!(LimiterRule::new("http://a.com", 0).unwrap().value, 0);
  }

  #[test]
  fn usage_key_format() {
    assert_eq!(usage_key("http://g1.com"), "limit-for-http://g1.com");
  }

  #[test]
  fn memory_counter_counts() {
    let counter = MemoryCounter::default();
    assert_eq!(counter.incr("k"), 1);
    assert_eq!(counter.incr("k"), 2);
    counter.set("j", 40);
    let snapshot = counter.counts.read().unwrap();
    assert_eq!(snapshot.get("j"), Some(&40));
    assert_eq!(snapshot.get("k"), Some(&2));
  }
}
