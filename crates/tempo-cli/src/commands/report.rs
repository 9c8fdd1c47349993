//! Report command: aggregated totals for a day, week, or month.
//!
//! The aggregation itself lives in `tempo-core`; this module resolves ids to
//! names from the taxonomy tables and renders human-readable or JSON output.

use std::collections::HashMap;
use std::fmt::Write;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tempo_core::{
    CategoryId, DayTotals, ReportPeriod, Reporter, SubcategoryId, TagId, week_days,
};
use tempo_db::Database;

/// Chart row with the category name resolved for display.
#[derive(Debug, Serialize)]
struct NamedChartPoint {
    category_id: CategoryId,
    category_name: String,
    total_hours: f64,
}

/// Name lookups for rendering report rows.
struct TaxonomyNames {
    categories: HashMap<CategoryId, String>,
    subcategories: HashMap<SubcategoryId, String>,
    tags: HashMap<TagId, String>,
}

impl TaxonomyNames {
    fn load(db: &Database) -> Result<Self> {
        let mut categories = HashMap::new();
        let mut subcategories = HashMap::new();
        for category in db.list_categories()? {
            for sub in db.subcategories_for_category(category.id)? {
                subcategories.insert(sub.id, sub.name);
            }
            categories.insert(category.id, category.name);
        }
        let tags = db
            .list_tags()?
            .into_iter()
            .map(|tag| (tag.id, tag.name))
            .collect();
        Ok(Self {
            categories,
            subcategories,
            tags,
        })
    }

    fn category(&self, id: CategoryId) -> String {
        self.categories
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("category {id}"))
    }

    /// Builds the display label for one totals row, e.g.
    /// `Work / Development [Rust, Backend]`.
    fn row_label(&self, row: &DayTotals) -> String {
        let mut label = self.category(row.category_id);
        if let Some(sub) = row.subcategory_id {
            let name = self
                .subcategories
                .get(&sub)
                .cloned()
                .unwrap_or_else(|| format!("subcategory {sub}"));
            write!(label, " / {name}").unwrap();
        }
        if !row.tag_ids.is_empty() {
            let names: Vec<String> = row
                .tag_ids
                .iter()
                .map(|id| {
                    self.tags
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| format!("tag {id}"))
                })
                .collect();
            write!(label, " [{}]", names.join(", ")).unwrap();
        }
        label
    }
}

// ========== Duration Formatting ==========

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m (defensive).
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "bar widths are tiny non-negative integers, well within f64 and usize"
)]
fn progress_bar(value: i64, max: i64) -> String {
    if max == 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        // Clamp in case value > max
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Rendering ==========

/// Formats the period description for the report header.
fn period_description(date: NaiveDate, period: ReportPeriod) -> String {
    match period {
        ReportPeriod::Daily => format!("{}", date.format("%A, %b %-d, %Y")),
        ReportPeriod::Weekly => {
            let monday = week_days(date)[0];
            format!("Week of {}", monday.format("%b %-d, %Y"))
        }
        ReportPeriod::Monthly => format!("{}", date.format("%B %Y")),
    }
}

fn format_totals(date: NaiveDate, period: ReportPeriod, rows: &[DayTotals], names: &TaxonomyNames) -> String {
    let mut output = String::new();
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
    writeln!(
        output,
        "TIME REPORT: {} ({timezone})",
        period_description(date, period)
    )
    .unwrap();
    writeln!(output).unwrap();

    if rows.is_empty() {
        writeln!(output, "No sessions recorded in this period.").unwrap();
        return output;
    }

    let max_total = rows.iter().map(|r| r.total_ms).max().unwrap_or(0);
    for row in rows {
        writeln!(
            output,
            "{} {:>8}  {}",
            progress_bar(row.total_ms, max_total),
            format_duration(row.total_ms),
            names.row_label(row),
        )
        .unwrap();
    }

    let total: i64 = rows.iter().map(|r| r.total_ms).sum();
    writeln!(output).unwrap();
    writeln!(output, "TOTAL: {}", format_duration(total)).unwrap();
    output
}

fn format_chart(date: NaiveDate, period: ReportPeriod, points: &[NamedChartPoint]) -> String {
    let mut output = String::new();
    writeln!(output, "HOURS BY CATEGORY: {}", period_description(date, period)).unwrap();
    writeln!(output).unwrap();

    if points.is_empty() {
        writeln!(output, "No sessions recorded in this period.").unwrap();
        return output;
    }

    for point in points {
        writeln!(output, "{:>8.2}h  {}", point.total_hours, point.category_name).unwrap();
    }
    output
}

/// Runs the report command.
pub fn run(
    db: &Database,
    date: NaiveDate,
    period: ReportPeriod,
    by_category: bool,
    json: bool,
) -> Result<()> {
    let reporter = Reporter::new(db);
    let names = TaxonomyNames::load(db)?;

    if by_category {
        let points: Vec<NamedChartPoint> = reporter
            .chart_data(date, period)?
            .into_iter()
            .map(|point| NamedChartPoint {
                category_id: point.category_id,
                category_name: names.category(point.category_id),
                total_hours: point.total_hours,
            })
            .collect();
        if json {
            println!("{}", serde_json::to_string_pretty(&points)?);
        } else {
            print!("{}", format_chart(date, period, &points));
        }
        return Ok(());
    }

    let rows = match period {
        ReportPeriod::Daily => reporter.totals_for_date(date)?,
        ReportPeriod::Weekly => reporter.totals_for_week(date)?,
        ReportPeriod::Monthly => reporter.totals_for_month(date)?,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", format_totals(date, period, &rows, &names));
    }
    Ok(())
}
