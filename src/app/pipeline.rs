//! Shared report pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! feed fetch -> line decode -> timestamp parse -> day alignment -> smoothing
//!
//! The first three steps are memoized by [`FeedCache`]; alignment and smoothing
//! rerun on every build.
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use tracing::warn;

use crate::align;
use crate::data::{FeedCache, FeedClient, LoadedFeed};
use crate::domain::{DailyPeak, DayCurve, OccupancyRecord, ReportConfig, Sample};
use crate::error::AppError;
use crate::math::smooth_curve;

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone)]
pub struct Dashboard {
    /// Number of feed records inside the window.
    pub record_count: usize,
    /// Most recent record, as delivered.
    pub latest_record: OccupancyRecord,
    pub latest: Sample,
    /// Today's curve; empty points when the day has not opened yet.
    pub today: DayCurve,
    /// Resampled days sharing today's weekday (today included), oldest first.
    pub history: Vec<DayCurve>,
    pub peaks: Vec<DailyPeak>,
}

impl Dashboard {
    /// Current occupancy as a whole percentage of capacity (truncated).
    pub fn percent_of_capacity(&self, capacity: i64) -> i64 {
        if capacity <= 0 {
            return 0;
        }
        (self.latest.count as f64 / capacity as f64 * 100.0).floor() as i64
    }
}

/// Build the dashboard from an already-parsed feed window.
pub fn build_dashboard(feed: &LoadedFeed, config: &ReportConfig) -> Result<Dashboard, AppError> {
    let latest_record = feed
        .records
        .last()
        .cloned()
        .ok_or_else(|| AppError::data("Feed window contains no records."))?;
    let samples = &feed.samples;

    let latest = align::latest(samples)
        .ok_or_else(|| AppError::data("Feed window contains no samples."))?;

    let mut today = align::today_curve(samples, config.opening_threshold)
        .ok_or_else(|| AppError::data("Feed window contains no samples."))?;
    if today.is_empty() {
        warn!(
            date = %today.date,
            threshold = config.opening_threshold,
            "today has not crossed the opening threshold"
        );
    }

    let mut history =
        align::same_weekday_curves(samples, config.opening_threshold, config.resample_minutes);

    smooth_curve(&mut today, config.smoothing);
    for curve in &mut history {
        smooth_curve(curve, config.smoothing);
    }

    let peaks = align::daily_peaks(samples);

    Ok(Dashboard {
        record_count: feed.len(),
        latest_record,
        latest,
        today,
        history,
        peaks,
    })
}

/// Fetch (through the memo) and build.
pub fn load_dashboard(
    cache: &mut FeedCache,
    client: &FeedClient,
    config: &ReportConfig,
) -> Result<Dashboard, AppError> {
    let feed = cache.load(config.truncate_weeks, || client.fetch_text())?;
    build_dashboard(feed, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SmoothingConfig;

    fn record(ts: &str, count: i64) -> OccupancyRecord {
        OccupancyRecord {
            datetime: ts.to_string(),
            count,
        }
    }

    fn fixture() -> LoadedFeed {
        LoadedFeed::from_records(vec![
            record("Tue Sep 06 07:00:00 PDT 2022", 30),
            record("Tue Sep 06 07:05:00 PDT 2022", 45),
            record("Mon Sep 12 07:00:00 PDT 2022", 90),
            record("Tue Sep 13 06:55:00 PDT 2022", 4),
            record("Tue Sep 13 07:00:00 PDT 2022", 22),
            record("Tue Sep 13 07:01:00 PDT 2022", 76),
        ])
        .unwrap()
    }

    fn unsmoothed() -> ReportConfig {
        ReportConfig {
            smoothing: SmoothingConfig { enabled: false, span: 10 },
            ..ReportConfig::default()
        }
    }

    #[test]
    fn builds_today_history_and_peaks() {
        let dash = build_dashboard(&fixture(), &unsmoothed()).unwrap();
        assert_eq!(dash.record_count, 6);
        assert_eq!(dash.latest.count, 76);
        assert_eq!(dash.latest_record.datetime, "Tue Sep 13 07:01:00 PDT 2022");
        assert_eq!(dash.today.points, vec![(420.0, 22.0), (421.0, 76.0)]);
        assert_eq!(dash.history.len(), 2);
        assert_eq!(dash.history[0].label, "Tue 09/06");
        assert_eq!(dash.history[0].points, vec![(420.0, 30.0), (425.0, 45.0)]);
        // Today's resampled curve sits in the history next to the full-resolution one.
        assert_eq!(dash.history[1].label, "Tue 09/13");
        assert_eq!(dash.history[1].points, vec![(420.0, 76.0)]);
        assert_eq!(dash.peaks.len(), 3);
        assert_eq!(dash.percent_of_capacity(150), 50);
    }

    #[test]
    fn smoothing_changes_counts_not_times() {
        let config = ReportConfig {
            smoothing: SmoothingConfig { enabled: true, span: 3 },
            ..ReportConfig::default()
        };
        let dash = build_dashboard(&fixture(), &config).unwrap();
        assert_eq!(dash.today.points[0], (420.0, 22.0));
        assert_eq!(dash.today.points[1].0, 421.0);
        assert!(dash.today.points[1].1 < 76.0);
    }

    #[test]
    fn empty_window_is_a_data_error() {
        let feed = LoadedFeed::from_records(Vec::new()).unwrap();
        let err = build_dashboard(&feed, &ReportConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn bad_timestamp_surfaces_as_error() {
        let err = LoadedFeed::from_records(vec![record("not a timestamp", 1)]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
