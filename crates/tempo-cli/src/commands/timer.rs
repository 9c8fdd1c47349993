//! Timer commands: start, stop, status.

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use tempo_core::{CategoryId, Reporter, SubcategoryId, TagId};
use tempo_db::Database;

use super::report::format_duration;

pub(crate) fn ensure_category_exists(db: &Database, id: CategoryId) -> Result<()> {
    let exists = db
        .list_categories()
        .context("failed to list categories")?
        .iter()
        .any(|c| c.id == id);
    if !exists {
        bail!("no category with id {id}; run 'tempo category list'");
    }
    Ok(())
}

/// Starts a timer, implicitly recording any previously running one.
pub fn start(
    db: &mut Database,
    category: i64,
    subcategory: Option<i64>,
    tags: &[i64],
) -> Result<()> {
    let category_id = CategoryId::new(category);
    ensure_category_exists(db, category_id)?;
    let tag_ids: Vec<TagId> = tags.iter().copied().map(TagId::new).collect();

    let converted = db
        .start_timer(
            category_id,
            subcategory.map(SubcategoryId::new),
            &tag_ids,
            Utc::now(),
        )
        .context("failed to start timer")?;

    if let Some(id) = converted {
        println!("Previous timer recorded as session {id}.");
    }
    println!("Timer started.");
    Ok(())
}

/// Stops the running timer and reports the recorded session.
pub fn stop(db: &mut Database) -> Result<()> {
    let session = db.stop_timer(Utc::now()).context("failed to stop timer")?;
    println!(
        "Recorded session {} ({}).",
        session.id,
        format_duration(session.duration_ms)
    );
    Ok(())
}

/// Shows the running timer, if any, and today's tracked hours.
pub fn status(db: &Database) -> Result<()> {
    match db.active_timer().context("failed to read active timer")? {
        Some(timer) => {
            let elapsed = (Utc::now() - timer.started_at).num_milliseconds();
            let started_local = timer.started_at.with_timezone(&Local);
            println!(
                "Timer running since {} ({} elapsed), category {}.",
                started_local.format("%H:%M"),
                format_duration(elapsed),
                timer.category_id,
            );
        }
        None => println!("No timer running."),
    }

    let today = Local::now().date_naive();
    let hours = Reporter::new(db)
        .total_hours_for_date(today)
        .context("failed to compute today's totals")?;
    println!("Tracked today: {hours}h");
    Ok(())
}
