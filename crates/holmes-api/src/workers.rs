//! Worker registry.

use chrono::{DateTime, Utc};
use holmes_core::{store::ReviewStore, worker::Worker};
use serde::Serialize;
use uuid::Uuid;

use crate::{ApiError, Result, parse_uuid};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerView {
  pub uuid:           Uuid,
  pub last_ping:      DateTime<Utc>,
  pub current_review: Option<Uuid>,
}

impl From<Worker> for WorkerView {
  fn from(w: Worker) -> Self {
    Self {
      uuid:           w.worker_id,
      last_ping:      w.last_ping,
      current_review: w.current_review_id,
    }
  }
}

fn worker_id(worker_uuid: &str) -> Result<Uuid> {
  parse_uuid(worker_uuid)
    .ok_or_else(|| ApiError::Validation(format!("{worker_uuid} is not a valid worker uuid")))
}

/// Register the worker on first contact; afterwards refresh its last ping.
pub async fn ping<S: ReviewStore>(store: &S, worker_uuid: &str) -> Result<WorkerView> {
  let worker = store
    .ping_worker(worker_id(worker_uuid)?)
    .await
    .map_err(ApiError::from_store)?;
  Ok(worker.into())
}

/// Point the worker at a review, or clear its reference with `None`.
pub async fn assign<S: ReviewStore>(
  store: &S,
  worker_uuid: &str,
  review_uuid: Option<&str>,
) -> Result<WorkerView> {
  let review_id = review_uuid
    .map(|raw| {
      parse_uuid(raw)
        .ok_or_else(|| ApiError::NotFound(format!("review with uuid of {raw} not found")))
    })
    .transpose()?;

  let worker = store
    .assign_worker_review(worker_id(worker_uuid)?, review_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(worker.into())
}

pub async fn get_worker<S: ReviewStore>(store: &S, worker_uuid: &str) -> Result<WorkerView> {
  store
    .get_worker(worker_id(worker_uuid)?)
    .await
    .map_err(ApiError::from_store)?
    .map(WorkerView::from)
    .ok_or_else(|| ApiError::NotFound(format!("worker with uuid of {worker_uuid} not found")))
}

pub async fn list_workers<S: ReviewStore>(store: &S) -> Result<Vec<WorkerView>> {
  let workers = store.list_workers().await.map_err(ApiError::from_store)?;
  Ok(workers.into_iter().map(WorkerView::from).collect())
}

#[cfg(test)]
mod tests {
  use holmes_store_sqlite::SqliteStore;

  use super::*;
  use crate::{pages::add_page, reviews::open_review};

  #[tokio::test]
  async fn worker_tracks_its_current_review() {
    let s = SqliteStore::open_in_memory().await.expect("in-memory store");
    let page = add_page(&s, "example.com", "http://example.com/").await.unwrap();
    let review = open_review(&s, &page.uuid.to_string()).await.unwrap();

    let id = Uuid::new_v4().to_string();
    let pinged = ping(&s, &id).await.unwrap();
    assert!(pinged.current_review.is_none());

    let review_id = review.uuid.to_string();
    let w = assign(&s, &id, Some(&review_id)).await.unwrap();
    assert_eq!(w.current_review, Some(review.uuid));

    let json = serde_json::to_value(&w).unwrap();
    assert_eq!(json["currentReview"], review_id);
    assert!(json["lastPing"].is_string());

    let w = assign(&s, &id, None).await.unwrap();
    assert!(w.current_review.is_none());
    assert_eq!(list_workers(&s).await.unwrap(), vec![w]);
  }

  #[tokio::test]
  async fn unknown_worker_or_review_is_rejected() {
    let s = SqliteStore::open_in_memory().await.expect("in-memory store");
    let id = Uuid::new_v4().to_string();

    assert!(matches!(get_worker(&s, &id).await, Err(ApiError::NotFound(_))));
    assert!(matches!(assign(&s, &id, None).await, Err(ApiError::NotFound(_))));
    assert!(matches!(ping(&s, "bogus").await, Err(ApiError::Validation(_))));

    ping(&s, &id).await.unwrap();
    let err = assign(&s, &id, Some("bogus")).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }
}
