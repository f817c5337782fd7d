use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{Recurring, Schedule};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Walk `count` consecutive due instants via `next_due_after`.
fn series(s: &Schedule, count: usize) -> Vec<DateTime<Utc>> {
    let mut out = Vec::with_capacity(count);
    let mut cur = s.first_due();
    while let Some(t) = cur {
        out.push(t);
        if out.len() == count {
            break;
        }
        cur = s.next_due_after(t);
    }
    out
}

// -- one-shot -----------------------------------------------------------

#[test]
fn one_shot_due_once_then_never() {
    let s = Schedule::once(at(2024, 3, 1, 9, 0));

    assert!(!s.is_due(at(2024, 3, 1, 8, 59), None));
    assert!(s.is_due(at(2024, 3, 1, 9, 0), None));
    assert!(s.is_due(at(2024, 6, 1, 0, 0), None));

    let fired = s.latest_occurrence(at(2024, 3, 1, 9, 5));
    assert_eq!(fired, Some(at(2024, 3, 1, 9, 0)));
    for later in [at(2024, 3, 1, 9, 5), at(2025, 1, 1, 0, 0)] {
        assert!(!s.is_due(later, fired));
    }
    assert_eq!(s.next_due_after(at(2024, 3, 1, 9, 0)), None);
}

#[test]
fn one_shot_uses_start_when_later_than_time() {
    let s = Schedule::once(at(2024, 3, 1, 9, 0)).starting(at(2024, 3, 2, 0, 0));
    assert_eq!(s.first_due(), Some(at(2024, 3, 2, 0, 0)));
    assert!(!s.is_due(at(2024, 3, 1, 12, 0), None));
    assert!(s.is_due(at(2024, 3, 2, 0, 0), None));
}

// -- fixed-length units -------------------------------------------------

#[test]
fn daily_period_spacing() {
    let s = Schedule::every(Recurring::Daily, 3, at(2024, 1, 1, 6, 30));
    let got = series(&s, 5);
    assert_eq!(got.len(), 5);
    for pair in got.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::days(3));
    }
    assert_eq!(got[4], at(2024, 1, 13, 6, 30));
}

#[test]
fn weekly_period_spacing() {
    let s = Schedule::every(Recurring::Weekly, 2, at(2024, 1, 1, 12, 0));
    let got = series(&s, 4);
    for pair in got.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::weeks(2));
    }
}

#[test]
fn start_skips_earlier_occurrences() {
    let s = Schedule::every(Recurring::Daily, 1, at(2024, 1, 1, 9, 0))
        .starting(at(2024, 1, 10, 10, 0));
    assert_eq!(s.first_due(), Some(at(2024, 1, 11, 9, 0)));
    assert_eq!(s.latest_occurrence(at(2024, 1, 11, 8, 0)), None);
    assert!(!s.is_due(at(2024, 1, 10, 23, 0), None));
}

#[test]
fn latest_occurrence_picks_largest_not_after_now() {
    let s = Schedule::every(Recurring::Daily, 1, at(2024, 1, 1, 9, 0));
    assert_eq!(
        s.latest_occurrence(at(2024, 1, 5, 8, 59)),
        Some(at(2024, 1, 4, 9, 0))
    );
    assert_eq!(
        s.latest_occurrence(at(2024, 1, 5, 9, 0)),
        Some(at(2024, 1, 5, 9, 0))
    );
}

#[test]
fn fired_occurrence_not_due_until_next() {
    let s = Schedule::every(Recurring::Daily, 1, at(2024, 1, 1, 9, 0));
    let fired = Some(at(2024, 1, 5, 9, 0));
    assert!(!s.is_due(at(2024, 1, 5, 18, 0), fired));
    assert!(!s.is_due(at(2024, 1, 6, 8, 59), fired));
    assert!(s.is_due(at(2024, 1, 6, 9, 0), fired));
}

#[test]
fn next_due_after_is_strict() {
    let s = Schedule::every(Recurring::Daily, 1, at(2024, 1, 1, 9, 0));
    assert_eq!(
        s.next_due_after(at(2024, 1, 3, 9, 0)),
        Some(at(2024, 1, 4, 9, 0))
    );
    assert_eq!(
        s.next_due_after(at(2024, 1, 3, 8, 0)),
        Some(at(2024, 1, 3, 9, 0))
    );
}

#[test]
fn missed_occurrences_collapse_to_next_after_now() {
    let s = Schedule::every(Recurring::Daily, 1, at(2024, 1, 1, 9, 0));
    let now = at(2024, 1, 20, 10, 0);
    assert_eq!(s.next_due_after(now), Some(at(2024, 1, 21, 9, 0)));
}

// -- months -------------------------------------------------------------

#[test]
fn monthly_clamps_to_last_day_from_anchor() {
    let s = Schedule::every(Recurring::Monthly, 1, at(2024, 1, 31, 8, 0));
    let got = series(&s, 5);
    assert_eq!(
        got,
        vec![
            at(2024, 1, 31, 8, 0),
            at(2024, 2, 29, 8, 0),
            at(2024, 3, 31, 8, 0),
            at(2024, 4, 30, 8, 0),
            at(2024, 5, 31, 8, 0),
        ]
    );
}

#[test]
fn monthly_non_leap_february() {
    let s = Schedule::every(Recurring::Monthly, 1, at(2023, 1, 31, 8, 0));
    assert_eq!(s.occurrence(1), Some(at(2023, 2, 28, 8, 0)));
    assert_eq!(s.occurrence(2), Some(at(2023, 3, 31, 8, 0)));
}

#[test]
fn monthly_period_counts_months() {
    let s = Schedule::every(Recurring::Monthly, 3, at(2024, 11, 30, 0, 0));
    let got = series(&s, 3);
    assert_eq!(
        got,
        vec![
            at(2024, 11, 30, 0, 0),
            at(2025, 2, 28, 0, 0),
            at(2025, 5, 30, 0, 0),
        ]
    );
}

#[test]
fn monthly_latest_occurrence_across_short_month() {
    let s = Schedule::every(Recurring::Monthly, 1, at(2024, 1, 31, 8, 0));
    // Mar 15 lies after Feb 29 and before Mar 31.
    assert_eq!(
        s.latest_occurrence(at(2024, 3, 15, 0, 0)),
        Some(at(2024, 2, 29, 8, 0))
    );
    assert_eq!(
        s.next_due_after(at(2024, 2, 29, 8, 0)),
        Some(at(2024, 3, 31, 8, 0))
    );
}

// -- invariants ---------------------------------------------------------

#[test]
fn zero_period_rejected_when_recurring() {
    let mut s = Schedule::every(Recurring::Weekly, 1, at(2024, 1, 1, 0, 0));
    s.recurring_period = 0;
    assert!(s.check().is_err());

    let mut once = Schedule::once(at(2024, 1, 1, 0, 0));
    once.recurring_period = 0;
    assert!(once.check().is_ok());
}

#[test]
fn deserializes_with_defaults() {
    let yaml = "start_date_time: 2024-01-01T00:00:00Z\ntime: 2024-01-01T09:00:00Z\n";
    let s: Schedule = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(s.recurring, Recurring::None);
    assert_eq!(s.recurring_period, 1);
}
