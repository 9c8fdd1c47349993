//! Time windows and session clamping.
//!
//! Reporting windows are calendar-day granularity in *local* time, not UTC:
//! a day window runs from local midnight to the last millisecond before the
//! next local midnight, converted to UTC instants for store queries.

use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};

/// A closed instant range `[start, end]` over which totals are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Result of clamping a session to a [`TimeWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedSpan {
    /// The clamped duration in milliseconds, 0 if no overlap.
    pub duration_ms: i64,
    /// Whether the session overlaps the window with positive length.
    pub has_overlap: bool,
}

impl ClampedSpan {
    const NONE: Self = Self {
        duration_ms: 0,
        has_overlap: false,
    };
}

/// Clamps a session's time range to a window.
///
/// Reported durations never exceed the window bounds and only reflect the
/// actual overlap between the session and the window. Zero-width overlap
/// (session exactly touching a boundary) does not count. Malformed sessions
/// with `session_end <= session_start` are treated as having no overlap
/// rather than producing a negative duration.
#[must_use]
pub fn clamp_to_window(
    session_start: DateTime<Utc>,
    session_end: DateTime<Utc>,
    window: TimeWindow,
) -> ClampedSpan {
    if session_end <= session_start {
        return ClampedSpan::NONE;
    }

    let effective_start = session_start.max(window.start);
    let effective_end = session_end.min(window.end);

    if effective_start >= effective_end {
        return ClampedSpan::NONE;
    }

    ClampedSpan {
        duration_ms: (effective_end - effective_start).num_milliseconds(),
        has_overlap: true,
    }
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight is rare but possible
            // Use 1am local which is guaranteed to exist
            let one_am = local_date.and_time(NaiveTime::from_hms_opt(1, 0, 0).unwrap());
            Local
                .from_local_datetime(&one_am)
                .earliest()
                .unwrap()
                .with_timezone(&Utc)
        }
    }
}

/// The closed day window for a local calendar date.
///
/// Runs from local midnight through the last millisecond of the day, so a
/// session starting exactly at `end` clamps to zero width and is excluded.
#[must_use]
pub fn day_window(date: NaiveDate) -> TimeWindow {
    let start = local_midnight_to_utc(date);
    let end = local_midnight_to_utc(date + Duration::days(1)) - Duration::milliseconds(1);
    TimeWindow { start, end }
}

/// The 7 dates of the Monday-start ISO week containing `date`.
#[must_use]
pub fn week_days(date: NaiveDate) -> Vec<NaiveDate> {
    let days_since_monday = date.weekday().num_days_from_monday();
    let monday = date - Duration::days(i64::from(days_since_monday));
    (0..7).map(|offset| monday + Duration::days(offset)).collect()
}

/// Every date of the calendar month containing `date`.
#[must_use]
pub fn month_days(date: NaiveDate) -> Vec<NaiveDate> {
    let first = date.with_day(1).unwrap();
    first
        .iter_days()
        .take_while(|day| day.month() == date.month())
        .collect()
}
