//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw feed records (`OccupancyRecord`) and parsed samples (`Sample`)
//! - aligned per-day curves (`DayCurve`) and daily peaks (`DailyPeak`)
//! - run configuration (`ReportConfig`, `SmoothingConfig`)

pub mod types;

pub use types::*;
