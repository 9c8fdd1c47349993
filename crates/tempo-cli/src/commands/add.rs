//! Back-fill command: record a completed session directly.

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Utc};
use tempo_core::{CategoryId, SubcategoryId, TagId};
use tempo_db::{Database, NewSession};

use super::report::format_duration;
use super::timer::ensure_category_exists;

pub fn run(
    db: &Database,
    category: i64,
    subcategory: Option<i64>,
    tags: &[i64],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<()> {
    ensure!(to > from, "session end must be after its start");
    let category_id = CategoryId::new(category);
    ensure_category_exists(db, category_id)?;

    let id = db
        .insert_session(&NewSession {
            category_id,
            subcategory_id: subcategory.map(SubcategoryId::new),
            tag_ids: tags.iter().copied().map(TagId::new).collect(),
            started_at: from,
            ended_at: to,
        })
        .context("failed to record session")?;

    println!(
        "Recorded session {id} ({}).",
        format_duration((to - from).num_milliseconds())
    );
    Ok(())
}
