//! Reporting utilities: summary sentences and the daily peak table.

pub mod format;

pub use format::*;
