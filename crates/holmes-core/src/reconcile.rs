//! The day-boundary rule applied when a review becomes authoritative.
//!
//! When a review completes, the page reconciler makes it the page's single
//! active review. Any other review of the same page created since the start
//! of the current calendar day is deleted (last write wins per day); older
//! reviews survive but are demoted. The transactional execution lives in the
//! storage backend; this module owns the rule itself.

use chrono::{DateTime, Duration, Local, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Start of the calendar day containing `now`, as observed in `tz`.
///
/// If local midnight does not exist (a DST jump at 00:00) the offset in
/// force at `now` is used instead.
pub fn day_start_in<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
  let local = now.with_timezone(tz);
  let midnight = local.date_naive().and_time(NaiveTime::MIN);

  match tz.from_local_datetime(&midnight).earliest() {
    Some(start) => start.with_timezone(&Utc),
    None => {
      let offset = local.offset().fix().local_minus_utc();
      Utc.from_utc_datetime(&(midnight - Duration::seconds(i64::from(offset))))
    }
  }
}

/// Start of the current day in server local time.
pub fn local_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
  day_start_in(now, &Local)
}

/// Whether `sibling` would be discarded as a same-day duplicate when
/// `review_id` is promoted.
pub fn is_same_day_duplicate(
  review_id: Uuid,
  sibling_id: Uuid,
  sibling_created_at: DateTime<Utc>,
  day_start: DateTime<Utc>,
) -> bool {
  sibling_id != review_id && sibling_created_at >= day_start
}

/// What a reconciliation did to the page's review set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
  /// The review now active for the page.
  pub review_id: Uuid,
  pub page_id:   Uuid,
  pub day_start: DateTime<Utc>,
  /// Same-day siblings that were deleted.
  pub deleted:   Vec<Uuid>,
  /// Surviving siblings flipped from active to inactive.
  pub demoted:   usize,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::FixedOffset;

  fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
  }

  #[test]
  fn day_start_truncates_to_midnight_utc() {
    let now = utc("2024-03-10T17:45:12.345Z");
    assert_eq!(day_start_in(now, &Utc), utc("2024-03-10T00:00:00Z"));
  }

  #[test]
  fn day_start_uses_the_local_calendar_day() {
    // 01:30 UTC is still the previous evening at UTC-05:00.
    let tz = FixedOffset::west_opt(5 * 3600).unwrap();
    let now = utc("2024-03-10T01:30:00Z");
    assert_eq!(day_start_in(now, &tz), utc("2024-03-09T05:00:00Z"));
  }

  #[test]
  fn day_start_east_of_utc() {
    let tz = FixedOffset::east_opt(9 * 3600).unwrap();
    let now = utc("2024-03-10T16:00:00Z");
    assert_eq!(day_start_in(now, &tz), utc("2024-03-10T15:00:00Z"));
  }

  #[test]
  fn same_day_rule() {
    let start = utc("2024-03-10T00:00:00Z");
    let me = Uuid::new_v4();
    let other = Uuid::new_v4();

    assert!(is_same_day_duplicate(me, other, start, start));
    assert!(is_same_day_duplicate(me, other, utc("2024-03-10T09:00:00Z"), start));
    assert!(!is_same_day_duplicate(me, other, utc("2024-03-09T23:59:59Z"), start));
    assert!(!is_same_day_duplicate(me, me, utc("2024-03-10T09:00:00Z"), start));
  }
}
