//! Rate-limiter rules.
//!
//! Rules live in the store; current usage lives in an external counter and is
//! only ever read here.

use holmes_core::{
  limiter::{Limiter, LimiterRule, UsageCounter, usage_key},
  store::ReviewStore,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{ApiError, Result};

/// A rule together with its current usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimiterUsageView {
  pub id:            Uuid,
  pub url:           String,
  pub current_value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimiterView {
  pub id:    Uuid,
  pub url:   String,
  pub value: i64,
}

impl From<Limiter> for LimiterView {
  fn from(l: Limiter) -> Self {
    Self { id: l.limiter_id, url: l.url, value: l.value }
  }
}

/// Body accepted by [`upsert_limiter`]. Both fields are required.
#[derive(Debug, Default, Deserialize)]
pub struct UpsertLimiterBody {
  pub url:   Option<String>,
  pub value: Option<i64>,
}

/// Every rule with its usage. Usage that is missing, or that the counter
/// fails to report, reads as 0.
pub async fn list_limiters<S, C>(store: &S, counter: &C) -> Result<Vec<LimiterUsageView>>
where
  S: ReviewStore,
  C: UsageCounter,
{
  let limiters = store.list_limiters().await.map_err(ApiError::from_store)?;

  let mut views = Vec::with_capacity(limiters.len());
  for limiter in limiters {
    let key = usage_key(&limiter.url);
    let current_value = match counter.limit_usage(&key).await {
      Ok(usage) => usage.unwrap_or(0),
      Err(e) => {
        warn!(key = %key, error = %e, "usage counter unavailable");
        0
      }
    };
    views.push(LimiterUsageView { id: limiter.limiter_id, url: limiter.url, current_value });
  }
  Ok(views)
}

pub async fn upsert_limiter<S: ReviewStore>(store: &S, body: UpsertLimiterBody) -> Result<LimiterView> {
  let (Some(url), Some(value)) = (body.url.filter(|u| !u.trim().is_empty()), body.value) else {
    return Err(ApiError::Validation("Not url or value".into()));
  };
  let rule = LimiterRule::new(url, value).map_err(ApiError::from_store)?;

  let limiter = store
    .add_or_update_limiter(rule)
    .await
    .map_err(ApiError::from_store)?;
  Ok(limiter.into())
}

#[cfg(test)]
mod tests {
  use std::{fmt, future::Future};

  use holmes_core::limiter::MemoryCounter;
  use holmes_store_sqlite::SqliteStore;

  use super::*;

  #[derive(Debug)]
  struct Down;

  impl fmt::Display for Down {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("connection refused") }
  }

  impl std::error::Error for Down {}

  /// A counter whose backing service is unreachable.
  struct DownCounter;

  impl UsageCounter for DownCounter {
    type Error = Down;

    fn limit_usage<'a>(
      &'a self,
      _key: &'a str,
    ) -> impl Future<Output = std::result::Result<Option<u64>, Down>> + Send + 'a {
      async { Err(Down) }
    }
  }

  fn body(url: &str, value: i64) -> UpsertLimiterBody {
    UpsertLimiterBody { url: Some(url.into()), value: Some(value) }
  }

  async fn store() -> SqliteStore {
    SqliteStore::open_in_memory().await.expect("in-memory store")
  }

  #[tokio::test]
  async fn upsert_requires_url_and_value() {
    let s = store().await;
    for b in [
      UpsertLimiterBody::default(),
      UpsertLimiterBody { url: Some("http://a.com".into()), value: None },
      UpsertLimiterBody { url: Some("  ".into()), value: Some(3) },
      UpsertLimiterBody { url: None, value: Some(3) },
    ] {
      let err = upsert_limiter(&s, b).await.unwrap_err();
      assert_eq!(err.status_code(), 400);
    }
    assert!(s.list_limiters().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn upsert_accepts_a_json_body() {
    let s = store().await;
    let b: UpsertLimiterBody = serde_json::from_str(r#"{"url": "http://a.com", "value": 5}"#).unwrap();
    let view = upsert_limiter(&s, b).await.unwrap();
    assert_eq!(view.url, "http://a.com");
    assert_eq!(view.value, 5);

    // Missing fields parse, then fail validation.
    let b: UpsertLimiterBody = serde_json::from_str(r#"{"url": "http://a.com"}"#).unwrap();
    let err = upsert_limiter(&s, b).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(s.list_limiters().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn upsert_updates_in_place() {
    let s = store().await;
    let first = upsert_limiter(&s, body("http://a.com", 5)).await.unwrap();
    let second = upsert_limiter(&s, body("http://a.com", 8)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.value, 8);
    assert_eq!(s.list_limiters().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn listing_reads_usage_from_the_counter() {
    let s = store().await;
    upsert_limiter(&s, body("http://a.com", 5)).await.unwrap();
    upsert_limiter(&s, body("http://b.com", 2)).await.unwrap();

    let counter = MemoryCounter::default();
    counter.set(usage_key("http://a.com"), 4);

    let views = list_limiters(&s, &counter).await.unwrap();
    assert_eq!(views[0].current_value, 4);
    assert_eq!(views[1].current_value, 0);

    let json = serde_json::to_value(&views[0]).unwrap();
    assert_eq!(json["currentValue"], 4);
  }

  #[tokio::test]
  async fn unavailable_counter_reads_as_zero() {
    let s = store().await;
    upsert_limiter(&s, body("http://a.com", 5)).await.unwrap();

    let views = list_limiters(&s, &DownCounter).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].current_value, 0);
  }
}
