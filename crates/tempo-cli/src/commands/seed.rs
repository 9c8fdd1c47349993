//! Seed command: populate sample taxonomy data for first runs.

use anyhow::{Context, Result};
use tempo_db::Database;

pub fn run(db: &mut Database) -> Result<()> {
    let seeded = db.seed_sample_data().context("failed to seed sample data")?;
    if seeded {
        println!("Seeded sample categories, subcategories, and tags.");
    } else {
        println!("Categories already exist, nothing seeded.");
    }
    Ok(())
}
