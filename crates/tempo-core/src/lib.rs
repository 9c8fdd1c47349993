//! Core domain logic for the tempo time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Window clamping: restricting a session's duration to its overlap with a window
//! - Grouping: canonical (category, subcategory, tags) identities for totals
//! - Aggregation: day, week, and month totals plus the category chart projection
//!
//! Persistence lives behind the [`SessionStore`] trait so the engine can be
//! driven by the SQLite store in `tempo-db` or an in-memory fake in tests.

pub mod group;
pub mod report;
pub mod types;
pub mod window;

pub use group::GroupKey;
pub use report::{
    ChartPoint, DayTotals, PeriodTotals, ReportPeriod, Reporter, SessionStore, MAX_DAY_MS,
};
pub use types::{
    ActiveTimer, Category, CategoryId, Session, SessionId, Subcategory, SubcategoryId, Tag, TagId,
};
pub use window::{clamp_to_window, day_window, month_days, week_days, ClampedSpan, TimeWindow};
