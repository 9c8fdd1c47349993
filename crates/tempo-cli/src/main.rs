use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tempo_core::ReportPeriod;
use tracing_subscriber::EnvFilter;

use tempo_cli::commands::{add, report, seed, taxonomy, timer};
use tempo_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<tempo_db::Database> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    tempo_db::Database::open(&config.database_path).context("failed to open database")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Start {
            category,
            subcategory,
            tags,
        }) => {
            let mut db = open_database(cli.config.as_deref())?;
            timer::start(&mut db, *category, *subcategory, tags)?;
        }
        Some(Commands::Stop) => {
            let mut db = open_database(cli.config.as_deref())?;
            timer::stop(&mut db)?;
        }
        Some(Commands::Status) => {
            let db = open_database(cli.config.as_deref())?;
            timer::status(&db)?;
        }
        Some(Commands::Add {
            category,
            subcategory,
            tags,
            from,
            to,
        }) => {
            let db = open_database(cli.config.as_deref())?;
            add::run(&db, *category, *subcategory, tags, *from, *to)?;
        }
        Some(Commands::Report {
            date,
            week,
            month,
            by_category,
            json,
        }) => {
            let db = open_database(cli.config.as_deref())?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let period = if *week {
                ReportPeriod::Weekly
            } else if *month {
                ReportPeriod::Monthly
            } else {
                ReportPeriod::Daily
            };
            report::run(&db, date, period, *by_category, *json)?;
        }
        Some(Commands::Category { action }) => {
            let db = open_database(cli.config.as_deref())?;
            taxonomy::category(&db, action)?;
        }
        Some(Commands::Subcategory { action }) => {
            let db = open_database(cli.config.as_deref())?;
            taxonomy::subcategory(&db, action)?;
        }
        Some(Commands::Tag { action }) => {
            let db = open_database(cli.config.as_deref())?;
            taxonomy::tag(&db, action)?;
        }
        Some(Commands::Seed) => {
            let mut db = open_database(cli.config.as_deref())?;
            seed::run(&mut db)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
