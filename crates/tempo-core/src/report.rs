//! Report aggregation: day, week, and month totals plus the chart projection.
//!
//! Totals are recomputed on every query and never persisted. Each call owns
//! its own local accumulator, so overlapping calls from different callers are
//! safe; there is no shared aggregation state and no subscription machinery.
//! Callers re-invoke when they want fresh numbers.
//!
//! # Attribution policy
//!
//! A session is considered for a day only if it *started* on that day. Its
//! duration is clamped to the day window, so a session crossing midnight is
//! attributed entirely to its start day with only the pre-midnight portion
//! counted. Period totals therefore equal the re-grouped sum of their days'
//! totals. This is intentional; do not "fix" it by splitting credit across
//! days.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::group::GroupKey;
use crate::types::{CategoryId, Session, SubcategoryId, TagId};
use crate::window::{clamp_to_window, day_window, month_days, week_days};

/// Physical maximum for a single group's total within one day: 24 hours.
pub const MAX_DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Read access to stored sessions.
///
/// The aggregation engine takes the store as an explicit dependency so tests
/// can substitute an in-memory fake. Query failures propagate unchanged
/// through the reporter's result type; the engine adds no recovery.
pub trait SessionStore {
    type Error: std::error::Error;

    /// Returns all sessions whose `started_at` lies within the given range,
    /// both bounds inclusive. Order is unspecified but should be stable
    /// across identical calls.
    fn sessions_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>, Self::Error>;
}

/// Accumulated clamped duration for one grouping identity within a window.
///
/// For a fixed window there is at most one row per distinct identity. Tag ids
/// are sorted ascending and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTotals {
    pub category_id: CategoryId,
    pub subcategory_id: Option<SubcategoryId>,
    pub tag_ids: Vec<TagId>,
    pub total_ms: i64,
}

/// Same shape as [`DayTotals`]; periods re-group per-day rows and sum them.
pub type PeriodTotals = DayTotals;

/// Reporting window granularity for the chart projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

/// Category-only roll-up of period totals, in hours.
///
/// Name resolution is left to the caller; this projection emits only ids and
/// numeric hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub category_id: CategoryId,
    pub total_hours: f64,
}

/// Groups (identity, duration) entries, preserving first-encounter order so
/// descending sorts break ties by store iteration order.
#[derive(Debug, Default)]
struct Accumulator {
    index: HashMap<GroupKey, usize>,
    rows: Vec<DayTotals>,
}

impl Accumulator {
    fn add(&mut self, key: GroupKey, duration_ms: i64) {
        if let Some(&slot) = self.index.get(&key) {
            self.rows[slot].total_ms += duration_ms;
        } else {
            self.index.insert(key.clone(), self.rows.len());
            self.rows.push(DayTotals {
                category_id: key.category_id,
                subcategory_id: key.subcategory_id,
                tag_ids: key.tag_ids,
                total_ms: duration_ms,
            });
        }
    }

    /// Consumes the accumulator, returning rows sorted descending by total.
    fn into_sorted_rows(self) -> Vec<DayTotals> {
        let mut rows = self.rows;
        rows.sort_by(|a, b| b.total_ms.cmp(&a.total_ms));
        rows
    }
}

/// Converts milliseconds to hours with 2-decimal rounding.
#[expect(
    clippy::cast_precision_loss,
    reason = "durations are far below the 2^52 ms precision limit"
)]
fn ms_to_hours(ms: i64) -> f64 {
    (ms as f64 / 3_600_000.0 * 100.0).round() / 100.0
}

/// The report aggregation engine.
///
/// Holds only a shared store reference; safe to call re-entrantly.
pub struct Reporter<'a, S> {
    store: &'a S,
}

impl<'a, S: SessionStore> Reporter<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Totals for one local calendar date, grouped by identity, sorted
    /// descending by duration.
    ///
    /// Only sessions that *started* within the day are considered (see the
    /// module docs for the attribution policy); each is clamped to the day
    /// window, and any group total exceeding 24 hours is clamped down with a
    /// warning since it can only come from duplicated or overlapping data.
    pub fn totals_for_date(&self, date: NaiveDate) -> Result<Vec<DayTotals>, S::Error> {
        let window = day_window(date);
        tracing::debug!(%date, start = %window.start, end = %window.end, "querying day sessions");
        let sessions = self.store.sessions_started_between(window.start, window.end)?;

        let mut acc = Accumulator::default();
        for session in &sessions {
            let span = clamp_to_window(session.started_at, session.ended_at, window);
            if !span.has_overlap {
                // e.g. a session starting exactly at the window end
                continue;
            }
            let key = GroupKey::new(session.category_id, session.subcategory_id, &session.tag_ids);
            acc.add(key, span.duration_ms);
        }

        let mut rows = acc.into_sorted_rows();
        for row in &mut rows {
            if row.total_ms > MAX_DAY_MS {
                tracing::warn!(
                    category_id = %row.category_id,
                    total_ms = row.total_ms,
                    "group total exceeds 24h for a single day, clamping; \
                     this usually indicates duplicated session data"
                );
                row.total_ms = MAX_DAY_MS;
            }
        }
        Ok(rows)
    }

    /// Totals for the Monday-start week containing `date`.
    pub fn totals_for_week(&self, date: NaiveDate) -> Result<Vec<PeriodTotals>, S::Error> {
        self.totals_for_days(&week_days(date))
    }

    /// Totals for the calendar month containing `date`.
    pub fn totals_for_month(&self, date: NaiveDate) -> Result<Vec<PeriodTotals>, S::Error> {
        self.totals_for_days(&month_days(date))
    }

    /// Aggregates each day independently, then re-groups and sums across
    /// days. A midnight-crossing session contributes once, on its start day.
    fn totals_for_days(&self, days: &[NaiveDate]) -> Result<Vec<PeriodTotals>, S::Error> {
        let mut acc = Accumulator::default();
        for &day in days {
            for row in self.totals_for_date(day)? {
                let key = GroupKey::new(row.category_id, row.subcategory_id, &row.tag_ids);
                acc.add(key, row.total_ms);
            }
        }
        Ok(acc.into_sorted_rows())
    }

    /// Total tracked hours for a date, 2-decimal rounded. Summary helper for
    /// status displays.
    pub fn total_hours_for_date(&self, date: NaiveDate) -> Result<f64, S::Error> {
        let total_ms: i64 = self.totals_for_date(date)?.iter().map(|r| r.total_ms).sum();
        Ok(ms_to_hours(total_ms))
    }

    /// Hours per category for the period containing `date`, subcategories and
    /// tags collapsed, sorted descending by hours.
    pub fn chart_data(
        &self,
        date: NaiveDate,
        period: ReportPeriod,
    ) -> Result<Vec<ChartPoint>, S::Error> {
        let totals = match period {
            ReportPeriod::Daily => self.totals_for_date(date)?,
            ReportPeriod::Weekly => self.totals_for_week(date)?,
            ReportPeriod::Monthly => self.totals_for_month(date)?,
        };

        // Roll up by category only, keeping first-encounter order for ties
        let mut index: HashMap<CategoryId, usize> = HashMap::new();
        let mut points: Vec<(CategoryId, i64)> = Vec::new();
        for row in &totals {
            if let Some(&slot) = index.get(&row.category_id) {
                points[slot].1 += row.total_ms;
            } else {
                index.insert(row.category_id, points.len());
                points.push((row.category_id, row.total_ms));
            }
        }

        let mut chart: Vec<ChartPoint> = points
            .into_iter()
            .map(|(category_id, total_ms)| ChartPoint {
                category_id,
                total_hours: ms_to_hours(total_ms),
            })
            .collect();
        chart.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
        Ok(chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SessionId, SubcategoryId, TagId};
    use chrono::{Local, TimeZone};

    /// In-memory store backed by a plain session list.
    #[derive(Debug, Default)]
    struct FakeStore {
        sessions: Vec<Session>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("store unavailable")]
    struct StoreDown;

    impl SessionStore for FakeStore {
        type Error = StoreDown;

        fn sessions_started_between(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Session>, Self::Error> {
            Ok(self
                .sessions
                .iter()
                .filter(|s| s.started_at >= start && s.started_at <= end)
                .cloned()
                .collect())
        }
    }

    /// Store whose every query fails, for error propagation tests.
    struct FailingStore;

    impl SessionStore for FailingStore {
        type Error = StoreDown;

        fn sessions_started_between(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<Session>, Self::Error> {
            Err(StoreDown)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A local wall-clock instant on the given date, as UTC.
    fn at(day: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
        Local
            .from_local_datetime(&day.and_hms_opt(hour, minute, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn tags(ids: &[i64]) -> Vec<TagId> {
        ids.iter().copied().map(TagId::new).collect()
    }

    fn session(
        id: i64,
        category: i64,
        subcategory: Option<i64>,
        tag_ids: &[i64],
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Session {
        Session {
            id: SessionId::new(id),
            category_id: CategoryId::new(category),
            subcategory_id: subcategory.map(SubcategoryId::new),
            tag_ids: tags(tag_ids),
            started_at,
            ended_at,
            duration_ms: (ended_at - started_at).num_milliseconds(),
        }
    }

    #[test]
    fn single_session_yields_one_row() {
        let day = date(2024, 1, 9);
        let store = FakeStore {
            sessions: vec![session(1, 1, None, &[], at(day, 9, 0), at(day, 10, 30))],
        };
        let rows = Reporter::new(&store).totals_for_date(day).unwrap();
        assert_eq!(
            rows,
            vec![DayTotals {
                category_id: CategoryId::new(1),
                subcategory_id: None,
                tag_ids: vec![],
                total_ms: 5_400_000,
            }]
        );
    }

    #[test]
    fn same_identity_merges_regardless_of_tag_order() {
        let day = date(2024, 1, 9);
        let store = FakeStore {
            sessions: vec![
                session(1, 1, Some(4), &[2, 1], at(day, 9, 0), at(day, 9, 30)),
                session(2, 1, Some(4), &[1, 2], at(day, 11, 0), at(day, 11, 45)),
            ],
        };
        let rows = Reporter::new(&store).totals_for_date(day).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_ms, 4_500_000);
        assert_eq!(rows[0].tag_ids, tags(&[1, 2]));
    }

    #[test]
    fn distinct_identities_stay_separate() {
        let day = date(2024, 1, 9);
        let store = FakeStore {
            sessions: vec![
                session(1, 1, None, &[], at(day, 9, 0), at(day, 10, 0)),
                session(2, 1, Some(4), &[], at(day, 10, 0), at(day, 11, 0)),
                session(3, 2, None, &[], at(day, 11, 0), at(day, 13, 0)),
            ],
        };
        let rows = Reporter::new(&store).totals_for_date(day).unwrap();
        assert_eq!(rows.len(), 3);
        // Sorted descending by total
        assert_eq!(rows[0].category_id, CategoryId::new(2));
        assert_eq!(rows[0].total_ms, 7_200_000);
        assert!(rows[1].total_ms >= rows[2].total_ms);
    }

    #[test]
    fn session_starting_at_day_end_contributes_nothing() {
        let day = date(2024, 1, 9);
        let end = day_window(day).end;
        let store = FakeStore {
            sessions: vec![session(1, 1, None, &[], end, end + chrono::Duration::hours(2))],
        };
        let rows = Reporter::new(&store).totals_for_date(day).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn midnight_crossing_session_attributed_to_start_day() {
        let day1 = date(2024, 1, 9);
        let day2 = date(2024, 1, 10);
        let store = FakeStore {
            sessions: vec![session(1, 1, None, &[], at(day1, 23, 0), at(day2, 1, 0))],
        };
        let reporter = Reporter::new(&store);

        let rows = reporter.totals_for_date(day1).unwrap();
        assert_eq!(rows.len(), 1);
        // Pre-midnight portion only, up to the last millisecond of the day
        assert_eq!(rows[0].total_ms, 3_599_999);

        // Nothing on the day it ended: attribution follows the start day
        assert!(reporter.totals_for_date(day2).unwrap().is_empty());
    }

    #[test]
    fn malformed_session_degrades_to_zero_not_failure() {
        let day = date(2024, 1, 9);
        let store = FakeStore {
            sessions: vec![
                // ended before it started
                session(1, 1, None, &[], at(day, 12, 0), at(day, 9, 0)),
                session(2, 1, None, &[], at(day, 14, 0), at(day, 15, 0)),
            ],
        };
        let rows = Reporter::new(&store).totals_for_date(day).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_ms, 3_600_000);
    }

    #[test]
    fn day_group_total_clamps_to_24h() {
        let day = date(2024, 1, 9);
        // Two overlapping 20h sessions with the same identity: physically
        // impossible, only producible by duplicated data
        let store = FakeStore {
            sessions: vec![
                session(1, 1, None, &[], at(day, 0, 0), at(day, 20, 0)),
                session(2, 1, None, &[], at(day, 0, 30), at(day, 20, 30)),
            ],
        };
        let rows = Reporter::new(&store).totals_for_date(day).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_ms, MAX_DAY_MS);
    }

    #[test]
    fn empty_store_yields_empty_rows() {
        let store = FakeStore::default();
        let rows = Reporter::new(&store).totals_for_date(date(2024, 1, 9)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn store_failure_propagates_unchanged() {
        let reporter = Reporter::new(&FailingStore);
        assert!(reporter.totals_for_date(date(2024, 1, 9)).is_err());
        assert!(reporter.totals_for_week(date(2024, 1, 9)).is_err());
        assert!(reporter.chart_data(date(2024, 1, 9), ReportPeriod::Monthly).is_err());
    }

    #[test]
    fn week_totals_equal_regrouped_sum_of_days() {
        let anchor = date(2024, 1, 9); // Tuesday
        let days = week_days(anchor);
        let store = FakeStore {
            sessions: vec![
                session(1, 1, None, &[1], at(days[0], 9, 0), at(days[0], 11, 0)),
                session(2, 1, None, &[1], at(days[2], 14, 0), at(days[2], 15, 30)),
                session(3, 2, None, &[], at(days[4], 8, 0), at(days[4], 9, 0)),
                // Saturday session crossing into Sunday
                session(4, 1, None, &[1], at(days[5], 23, 0), at(days[6], 1, 0)),
            ],
        };
        let reporter = Reporter::new(&store);
        let week = reporter.totals_for_week(anchor).unwrap();

        // Manual re-group of the 7 per-day results
        let mut expected: HashMap<GroupKey, i64> = HashMap::new();
        for &day in &days {
            for row in reporter.totals_for_date(day).unwrap() {
                let key = GroupKey::new(row.category_id, row.subcategory_id, &row.tag_ids);
                *expected.entry(key).or_default() += row.total_ms;
            }
        }
        assert_eq!(week.len(), expected.len());
        for row in &week {
            let key = GroupKey::new(row.category_id, row.subcategory_id, &row.tag_ids);
            assert_eq!(expected[&key], row.total_ms);
        }

        // The midnight-crossing session merged into the same identity row
        let cat1_tagged: Vec<_> = week
            .iter()
            .filter(|r| r.category_id == CategoryId::new(1) && r.tag_ids == tags(&[1]))
            .collect();
        assert_eq!(cat1_tagged.len(), 1);
        assert_eq!(cat1_tagged[0].total_ms, 7_200_000 + 5_400_000 + 3_599_999);
    }

    #[test]
    fn month_totals_merge_identities_across_days() {
        let store = FakeStore {
            sessions: vec![
                session(1, 1, None, &[], at(date(2024, 1, 3), 9, 0), at(date(2024, 1, 3), 10, 0)),
                session(2, 1, None, &[], at(date(2024, 1, 25), 9, 0), at(date(2024, 1, 25), 10, 0)),
                // Different month, must not appear
                session(3, 1, None, &[], at(date(2024, 2, 1), 9, 0), at(date(2024, 2, 1), 10, 0)),
            ],
        };
        let rows = Reporter::new(&store).totals_for_month(date(2024, 1, 15)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_ms, 7_200_000);
    }

    #[test]
    fn chart_data_rolls_up_to_categories() {
        let day = date(2024, 1, 9);
        // Work (1): 5h across two identities; Learning (2): 2h
        let store = FakeStore {
            sessions: vec![
                session(1, 1, Some(4), &[1], at(day, 8, 0), at(day, 11, 0)),
                session(2, 1, None, &[], at(day, 12, 0), at(day, 14, 0)),
                session(3, 2, None, &[], at(day, 15, 0), at(day, 17, 0)),
            ],
        };
        let chart = Reporter::new(&store).chart_data(day, ReportPeriod::Daily).unwrap();
        assert_eq!(
            chart,
            vec![
                ChartPoint { category_id: CategoryId::new(1), total_hours: 5.0 },
                ChartPoint { category_id: CategoryId::new(2), total_hours: 2.0 },
            ]
        );
    }

    #[test]
    fn chart_hours_round_to_two_decimals() {
        let day = date(2024, 1, 9);
        // 1,000,000 ms = 0.2777..h, rounds to 0.28
        let store = FakeStore {
            sessions: vec![session(
                1,
                1,
                None,
                &[],
                at(day, 9, 0),
                at(day, 9, 0) + chrono::Duration::milliseconds(1_000_000),
            )],
        };
        let chart = Reporter::new(&store).chart_data(day, ReportPeriod::Daily).unwrap();
        assert!((chart[0].total_hours - 0.28).abs() < f64::EPSILON);
    }

    #[test]
    fn total_hours_for_date_sums_all_rows() {
        let day = date(2024, 1, 9);
        let store = FakeStore {
            sessions: vec![
                session(1, 1, None, &[], at(day, 9, 0), at(day, 10, 0)),
                session(2, 2, None, &[], at(day, 10, 0), at(day, 10, 30)),
            ],
        };
        let hours = Reporter::new(&store).total_hours_for_date(day).unwrap();
        assert!((hours - 1.5).abs() < f64::EPSILON);
    }
}
