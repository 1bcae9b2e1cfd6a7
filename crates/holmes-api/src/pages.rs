//! Page registration and history.

use chrono::{DateTime, Utc};
use holmes_core::{page::Page, store::ReviewStore};
use serde::Serialize;
use uuid::Uuid;

use crate::{ApiError, Result, parse_uuid, reviews::ReviewView};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
  pub uuid:             Uuid,
  pub domain:           String,
  pub url:              String,
  pub created_date:     DateTime<Utc>,
  pub last_review:      Option<Uuid>,
  pub last_review_date: Option<DateTime<Utc>>,
}

impl From<Page> for PageView {
  fn from(p: Page) -> Self {
    Self {
      uuid:             p.page_id,
      domain:           p.domain,
      url:              p.url,
      created_date:     p.created_at,
      last_review:      p.last_review_id,
      last_review_date: p.last_review_date,
    }
  }
}

pub(crate) fn page_id(page_uuid: &str) -> Result<Uuid> {
  parse_uuid(page_uuid)
    .ok_or_else(|| ApiError::NotFound(format!("page with uuid of {page_uuid} not found")))
}

pub async fn add_page<S: ReviewStore>(store: &S, domain: &str, url: &str) -> Result<PageView> {
  let page = store
    .add_page(domain.to_owned(), url.to_owned())
    .await
    .map_err(ApiError::from_store)?;
  Ok(page.into())
}

pub async fn get_page<S: ReviewStore>(store: &S, page_uuid: &str) -> Result<PageView> {
  store
    .get_page(page_id(page_uuid)?)
    .await
    .map_err(ApiError::from_store)?
    .map(PageView::from)
    .ok_or_else(|| ApiError::NotFound(format!("page with uuid of {page_uuid} not found")))
}

/// Every review of the page, newest first, including demoted ones.
pub async fn page_reviews<S: ReviewStore>(store: &S, page_uuid: &str) -> Result<Vec<ReviewView>> {
  let reviews = store
    .reviews_for_page(page_id(page_uuid)?)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reviews.into_iter().map(ReviewView::from).collect())
}

#[cfg(test)]
mod tests {
  use holmes_store_sqlite::SqliteStore;

  use super::*;
  use crate::reviews::create_review;

  #[tokio::test]
  async fn page_points_at_its_latest_review() {
    let s = SqliteStore::open_in_memory().await.expect("in-memory store");
    let page = add_page(&s, "example.com", "http://example.com/").await.unwrap();
    assert!(page.last_review.is_none());

    let uuid = page.uuid.to_string();
    let created = create_review(&s, &uuid, r#"{"facts": [], "violations": []}"#)
      .await
      .unwrap();

    let page = get_page(&s, &uuid).await.unwrap();
    assert_eq!(page.last_review, Some(created.uuid));

    let history = page_reviews(&s, &uuid).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].uuid, created.uuid);
  }

  #[tokio::test]
  async fn duplicate_url_is_a_conflict() {
    let s = SqliteStore::open_in_memory().await.expect("in-memory store");
    add_page(&s, "example.com", "http://example.com/").await.unwrap();
    let err = add_page(&s, "example.com", "http://example.com/").await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
  }

  #[tokio::test]
  async fn unknown_page_is_not_found() {
    let s = SqliteStore::open_in_memory().await.expect("in-memory store");
    for uuid in ["nope".to_string(), Uuid::new_v4().to_string()] {
      assert!(matches!(get_page(&s, &uuid).await, Err(ApiError::NotFound(_))));
      assert!(matches!(page_reviews(&s, &uuid).await, Err(ApiError::NotFound(_))));
    }
  }
}
