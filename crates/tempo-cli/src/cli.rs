//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

/// Personal time tracker.
///
/// Categorize activities, run a start/stop timer, and view aggregated hour
/// reports over day, week, and month windows.
#[derive(Debug, Parser)]
#[command(name = "tempo", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a timer, replacing any running one.
    Start {
        /// Category id to track against.
        #[arg(long)]
        category: i64,

        /// Optional subcategory id.
        #[arg(long)]
        subcategory: Option<i64>,

        /// Tag id; repeat for multiple tags.
        #[arg(long = "tag")]
        tags: Vec<i64>,
    },

    /// Stop the running timer and record the session.
    Stop,

    /// Show the running timer and today's tracked hours.
    Status,

    /// Record a completed session directly (back-fill).
    Add {
        /// Category id to track against.
        #[arg(long)]
        category: i64,

        /// Optional subcategory id.
        #[arg(long)]
        subcategory: Option<i64>,

        /// Tag id; repeat for multiple tags.
        #[arg(long = "tag")]
        tags: Vec<i64>,

        /// Session start, RFC 3339 (e.g., 2024-01-09T09:00:00Z).
        #[arg(long)]
        from: DateTime<Utc>,

        /// Session end, RFC 3339.
        #[arg(long)]
        to: DateTime<Utc>,
    },

    /// Show aggregated totals for a day, week, or month.
    Report {
        /// Date inside the reporting window (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Report the Monday-start week containing the date.
        #[arg(long, conflicts_with = "month")]
        week: bool,

        /// Report the calendar month containing the date.
        #[arg(long)]
        month: bool,

        /// Roll totals up to hours per category.
        #[arg(long)]
        by_category: bool,

        /// Output JSON instead of the human-readable report.
        #[arg(long)]
        json: bool,
    },

    /// Manage categories.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Manage subcategories.
    Subcategory {
        #[command(subcommand)]
        action: SubcategoryAction,
    },

    /// Manage tags.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Seed sample categories, subcategories, and tags.
    Seed,
}

/// Category management actions.
#[derive(Debug, Subcommand)]
pub enum CategoryAction {
    /// Add a category.
    Add { name: String },
    /// List all categories.
    List,
    /// Delete a category and its subcategories.
    Rm { id: i64 },
}

/// Subcategory management actions.
#[derive(Debug, Subcommand)]
pub enum SubcategoryAction {
    /// Add a subcategory under a category.
    Add {
        name: String,
        /// Parent category id.
        #[arg(long)]
        category: i64,
    },
    /// List the subcategories of a category.
    List {
        /// Parent category id.
        #[arg(long)]
        category: i64,
    },
    /// Delete a subcategory.
    Rm { id: i64 },
}

/// Tag management actions.
#[derive(Debug, Subcommand)]
pub enum TagAction {
    /// Add a tag.
    Add { name: String },
    /// List all tags.
    List,
    /// Delete a tag.
    Rm { id: i64 },
}
