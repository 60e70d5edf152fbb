//! Terminal output for chatheat
//!
//! Summary tables and month grids for people, JSON for scripts.

pub mod output;

pub use output::{JsonFormatter, OutputFormatter, TableFormatter, get_formatter};
