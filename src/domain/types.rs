//! Shared domain types.
//!
//! Raw feed records are kept exactly as delivered and memoized with their parsed
//! samples; curves and peaks are derived on each load and thrown away once the
//! report is rendered.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;

/// Default feed location.
pub const DEFAULT_FEED_URL: &str = "https://people.eecs.berkeley.edu/~paras/rsf_occupancy.jsonl";

/// The feed records one sample per minute.
pub const SAMPLES_PER_WEEK: usize = 60 * 24 * 7;

/// Maximum trailing window (weeks) offered by the controls.
pub const MAX_TRUNCATE_WEEKS: usize = 12;

/// Valid EMA span range.
pub const MIN_EMA_SPAN: usize = 1;
pub const MAX_EMA_SPAN: usize = 60;

/// One line of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OccupancyRecord {
    /// Timestamp exactly as the feed spells it, e.g. `Tue Sep 13 14:05:01 PDT 2022`.
    pub datetime: String,
    pub count: i64,
}

/// A record with its timestamp parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub at: NaiveDateTime,
    pub count: i64,
}

impl Sample {
    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }

    /// Minutes since midnight of the sample's own day.
    pub fn minute_of_day(&self) -> f64 {
        let t = self.at.time();
        t.num_seconds_from_midnight() as f64 / 60.0
    }
}

/// One day's occupancy, re-based to minutes since midnight so days overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCurve {
    pub date: NaiveDate,
    pub label: String,
    /// `(minute_of_day, count)` in time order.
    pub points: Vec<(f64, f64)>,
}

impl DayCurve {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn counts(&self) -> Vec<f64> {
        self.points.iter().map(|&(_, y)| y).collect()
    }
}

/// The busiest moment of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyPeak {
    pub date: NaiveDate,
    pub peak: i64,
    /// First time the peak was reached.
    pub at: NaiveDateTime,
}

/// EMA smoothing applied to every plotted curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothingConfig {
    pub enabled: bool,
    pub span: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            span: 10,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults) and mutated by the TUI controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub feed_url: String,
    /// Trailing window in weeks; `0` keeps the whole feed.
    pub truncate_weeks: usize,
    pub smoothing: SmoothingConfig,
    /// A day "opens" at the first sample with a count strictly above this.
    pub opening_threshold: i64,
    /// Bin width used when resampling historical days.
    pub resample_minutes: u32,
    /// Nominal facility capacity (drawn as a reference line).
    pub capacity: i64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            truncate_weeks: 3,
            smoothing: SmoothingConfig::default(),
            opening_threshold: 20,
            resample_minutes: 5,
            capacity: 150,
        }
    }
}
