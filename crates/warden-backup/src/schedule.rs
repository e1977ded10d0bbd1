//! Pure next-fire-time computation. The scheduler drives this with a plain
//! sleep-until-deadline loop; the computation, not the timer primitive, is
//! the contract.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike, Weekday};

use warden_core::proto::{BackupInterval, TimeOfDay};

/// Scheduled backups fire on a fixed weekday, not "seven days after the
/// last run".
const WEEKLY_FIRE_DAY: Weekday = Weekday::Sun;

/// The first instant strictly after `after` at which a schedule with the
/// given interval and time-of-day fires. `None` only when the local
/// calendar cannot produce a valid instant at all.
pub fn next_fire(
    interval: BackupInterval,
    time: TimeOfDay,
    after: DateTime<Local>,
) -> Option<DateTime<Local>> {
    match interval.aligned_minutes() {
        Some(step) => next_aligned(after, step),
        None => {
            let weekday = match interval {
                BackupInterval::Weekly => Some(WEEKLY_FIRE_DAY),
                _ => None,
            };
            next_calendar(after, time, weekday)
        }
    }
}

/// Next `:00/:15/:30/:45`-style boundary. Alignment to the wall clock, not
/// an offset from "now", so repeated re-arming cannot drift.
fn next_aligned(after: DateTime<Local>, step_minutes: u32) -> Option<DateTime<Local>> {
    let floor = after
        .naive_local()
        .with_second(0)?
        .with_nanosecond(0)?;
    let past_boundary = floor.minute() / step_minutes * step_minutes;
    let mut candidate =
        floor.with_minute(0)? + Duration::minutes(i64::from(past_boundary + step_minutes));

    // A DST gap can swallow a boundary; step over it.
    for _ in 0..8 {
        if let Some(resolved) = resolve_local(candidate) {
            if resolved > after {
                return Some(resolved);
            }
        }
        candidate += Duration::minutes(i64::from(step_minutes));
    }
    None
}

/// Next occurrence of `time`, optionally constrained to a weekday: today if
/// still ahead, otherwise the next matching calendar day.
fn next_calendar(
    after: DateTime<Local>,
    time: TimeOfDay,
    weekday: Option<Weekday>,
) -> Option<DateTime<Local>> {
    let fire_time = NaiveTime::from_hms_opt(u32::from(time.hour()), u32::from(time.minute()), 0)?;
    let mut date = after.date_naive();

    // Two weeks is enough to clear any weekday constraint plus a DST gap.
    for _ in 0..15 {
        if weekday.map_or(true, |day| date.weekday() == day) {
            if let Some(resolved) = resolve_local(date.and_time(fire_time)) {
                if resolved > after {
                    return Some(resolved);
                }
            }
        }
        date = date.succ_opt()?;
    }
    None
}

fn resolve_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&naive).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn tod(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::new(h, m).unwrap()
    }

    #[test]
    fn every_15min_aligns_to_quarter_hours() {
        // Armed at 10:07 -> fires at 10:15, not 10:22.
        let now = at(2024, 5, 14, 10, 7, 0);
        let fire = next_fire(BackupInterval::Every15Min, tod(3, 0), now).unwrap();
        assert_eq!(fire, at(2024, 5, 14, 10, 15, 0));

        let now = at(2024, 5, 14, 10, 52, 30);
        let fire = next_fire(BackupInterval::Every15Min, tod(3, 0), now).unwrap();
        assert_eq!(fire, at(2024, 5, 14, 11, 0, 0));
    }

    #[test]
    fn boundary_instant_moves_to_the_next_slot() {
        let now = at(2024, 5, 14, 10, 15, 0);
        let fire = next_fire(BackupInterval::Every15Min, tod(3, 0), now).unwrap();
        assert_eq!(fire, at(2024, 5, 14, 10, 30, 0));
    }

    #[test]
    fn every_30min_and_hourly_alignment() {
        let now = at(2024, 5, 14, 10, 31, 0);
        let fire = next_fire(BackupInterval::Every30Min, tod(3, 0), now).unwrap();
        assert_eq!(fire, at(2024, 5, 14, 11, 0, 0));

        let fire = next_fire(BackupInterval::Hourly, tod(3, 0), now).unwrap();
        assert_eq!(fire, at(2024, 5, 14, 11, 0, 0));

        // Hourly rolls across midnight.
        let now = at(2024, 5, 14, 23, 40, 0);
        let fire = next_fire(BackupInterval::Hourly, tod(3, 0), now).unwrap();
        assert_eq!(fire, at(2024, 5, 15, 0, 0, 0));
    }

    #[test]
    fn daily_fires_today_or_tomorrow_never_in_the_past() {
        let before = at(2024, 5, 14, 2, 0, 0);
        let fire = next_fire(BackupInterval::Daily, tod(3, 0), before).unwrap();
        assert_eq!(fire, at(2024, 5, 14, 3, 0, 0));

        let after = at(2024, 5, 14, 4, 0, 0);
        let fire = next_fire(BackupInterval::Daily, tod(3, 0), after).unwrap();
        assert_eq!(fire, at(2024, 5, 15, 3, 0, 0));

        let exactly = at(2024, 5, 14, 3, 0, 0);
        let fire = next_fire(BackupInterval::Daily, tod(3, 0), exactly).unwrap();
        assert_eq!(fire, at(2024, 5, 15, 3, 0, 0));
    }

    #[test]
    fn weekly_fires_on_sunday() {
        // 2024-05-14 is a Tuesday.
        let now = at(2024, 5, 14, 10, 0, 0);
        let fire = next_fire(BackupInterval::Weekly, tod(3, 0), now).unwrap();
        assert_eq!(fire, at(2024, 5, 19, 3, 0, 0));
        assert_eq!(fire.weekday(), Weekday::Sun);

        // On Sunday before the fire time it stays on the same day.
        let sunday_early = at(2024, 5, 19, 1, 0, 0);
        let fire = next_fire(BackupInterval::Weekly, tod(3, 0), sunday_early).unwrap();
        assert_eq!(fire, at(2024, 5, 19, 3, 0, 0));

        // On Sunday after the fire time it skips a full week.
        let sunday_late = at(2024, 5, 19, 4, 0, 0);
        let fire = next_fire(BackupInterval::Weekly, tod(3, 0), sunday_late).unwrap();
        assert_eq!(fire, at(2024, 5, 26, 3, 0, 0));
    }

    #[test]
    fn fire_time_is_always_strictly_in_the_future() {
        let intervals = [
            BackupInterval::Every15Min,
            BackupInterval::Every30Min,
            BackupInterval::Hourly,
            BackupInterval::Daily,
            BackupInterval::Weekly,
        ];
        for interval in intervals {
            for minute in [0, 1, 14, 15, 29, 30, 44, 59] {
                let now = at(2024, 5, 14, 10, minute, 13);
                let fire = next_fire(interval, tod(3, 30), now).unwrap();
                assert!(fire > now, "{interval:?} at :{minute:02} produced {fire}");
            }
        }
    }
}
