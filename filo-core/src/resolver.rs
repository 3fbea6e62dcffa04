//! Status resolution from authoritative timestamps

use chrono::{DateTime, Utc};

use crate::types::{from_millis, AuthoritativeStatus, HuntStatus, TimerRecord};

/// Derive the lifecycle status of a timer record at `now`
///
/// Checked in this order, first match wins:
/// 1. `MAXED` when `now >= maxAt`
/// 2. `OPENED` when `now >= openAt`
/// 3. `DIED` when a death is on record
/// 4. `CLOSED`
///
/// Unset timestamps never match, so a record with no data is `CLOSED`.
pub fn resolve(record: &TimerRecord, now: DateTime<Utc>) -> AuthoritativeStatus {
    let open_at = record.open_date.and_then(from_millis);
    let max_at = record.max_date.and_then(from_millis);
    let last_death_at = record.last_death.and_then(from_millis);

    let status = if max_at.is_some_and(|max| now >= max) {
        HuntStatus::Maxed
    } else if open_at.is_some_and(|open| now >= open) {
        HuntStatus::Opened
    } else if last_death_at.is_some() {
        HuntStatus::Died
    } else {
        HuntStatus::Closed
    };

    AuthoritativeStatus {
        status,
        open_at,
        max_at,
        last_death_at,
        last_alive_at: record.last_alive.and_then(from_millis),
        last_mark_at: record.last_mark.and_then(from_millis),
        last_attempt_by: record
            .last_try_user
            .as_ref()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn millis(t: DateTime<Utc>) -> Option<i64> {
        Some(t.timestamp_millis())
    }

    fn record(open: Option<i64>, max: Option<i64>, death: Option<i64>) -> TimerRecord {
        TimerRecord {
            open_date: open,
            max_date: max,
            last_death: death,
            ..Default::default()
        }
    }

    #[test]
    fn test_open_window_resolves_opened() {
        let now = Utc::now();
        let rec = record(
            millis(now - Duration::seconds(10)),
            millis(now + Duration::seconds(600)),
            None,
        );
        assert_eq!(resolve(&rec, now).status, HuntStatus::Opened);
    }

    #[test]
    fn test_maxed_wins_over_everything() {
        let now = Utc::now();
        let past = millis(now - Duration::hours(1));
        let rec = record(past, millis(now), past);
        assert_eq!(resolve(&rec, now).status, HuntStatus::Maxed);

        // max before open is still maxed
        let rec = record(millis(now + Duration::hours(1)), past, None);
        assert_eq!(resolve(&rec, now).status, HuntStatus::Maxed);
    }

    #[test]
    fn test_died_and_closed() {
        let now = Utc::now();
        let future_open = millis(now + Duration::hours(4));
        let future_max = millis(now + Duration::hours(6));

        let dead = record(future_open, future_max, millis(now - Duration::minutes(3)));
        let resolved = resolve(&dead, now);
        assert_eq!(resolved.status, HuntStatus::Died);
        assert!(resolved.last_death_at.is_some());

        let closed = record(future_open, future_max, None);
        assert_eq!(resolve(&closed, now).status, HuntStatus::Closed);
    }

    #[test]
    fn test_missing_timestamps_are_closed() {
        let resolved = resolve(&TimerRecord::default(), Utc::now());
        assert_eq!(resolved, AuthoritativeStatus::closed());
    }

    #[test]
    fn test_status_never_regresses_as_time_passes() {
        let base = Utc::now();
        let rec = record(
            millis(base + Duration::hours(4)),
            millis(base + Duration::hours(6)),
            millis(base),
        );

        let phase = |s: HuntStatus| match s {
            HuntStatus::Closed | HuntStatus::Died => 0,
            HuntStatus::Opened => 1,
            HuntStatus::Maxed => 2,
        };

        let mut last = 0;
        for minute in (0..=480).step_by(15) {
            let current = phase(resolve(&rec, base + Duration::minutes(minute)).status);
            assert!(current >= last, "regressed at minute {}", minute);
            last = current;
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn test_exactly_one_status_for_timestamp_grid() {
        let now = Utc::now();
        let offsets = [None, Some(-600), Some(0), Some(600)];
        for open in offsets {
            for max in offsets {
                for death in [None, Some(-60)] {
                    let at = |o: Option<i64>| o.and_then(|s| millis(now + Duration::seconds(s)));
                    let status = resolve(&record(at(open), at(max), at(death)), now).status;
                    if max.is_some_and(|m| m <= 0) {
                        assert_eq!(status, HuntStatus::Maxed);
                    } else if open.is_some_and(|o| o <= 0) {
                        assert_eq!(status, HuntStatus::Opened);
                    } else if death.is_some() {
                        assert_eq!(status, HuntStatus::Died);
                    } else {
                        assert_eq!(status, HuntStatus::Closed);
                    }
                }
            }
        }
    }
}
