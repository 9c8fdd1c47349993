//! CLI command implementations.

pub mod add;
pub mod report;
pub mod seed;
pub mod taxonomy;
pub mod timer;
