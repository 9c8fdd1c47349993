//! Time tracker CLI library.
//!
//! This crate provides the CLI interface for the tempo time tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{CategoryAction, Cli, Commands, SubcategoryAction, TagAction};
pub use config::Config;
