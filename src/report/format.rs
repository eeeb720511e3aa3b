//! Formatted terminal output.
//!
//! We keep formatting code in one place so output changes are localized and the
//! TUI header and the `report` command print the same sentences.

use crate::app::pipeline::Dashboard;
use crate::domain::{DailyPeak, DayCurve, ReportConfig};

/// `Loaded N records` line.
pub fn format_loaded(dashboard: &Dashboard) -> String {
    format!("Loaded {} records", dashboard.record_count)
}

/// Current occupancy sentence.
pub fn format_current(dashboard: &Dashboard, config: &ReportConfig) -> String {
    format!(
        "{} people in RSF, {}% of capacity (updated at {})",
        dashboard.latest.count,
        dashboard.percent_of_capacity(config.capacity),
        dashboard.latest_record.datetime,
    )
}

/// Overlay chart title.
pub fn format_chart_title(config: &ReportConfig) -> String {
    if config.truncate_weeks == 0 {
        "RSF occupancy by hour (all history)".to_string()
    } else {
        format!("RSF occupancy by hour (last {} weeks)", config.truncate_weeks)
    }
}

/// Full text summary printed by `rsf report`.
pub fn format_summary(dashboard: &Dashboard, config: &ReportConfig) -> String {
    let mut out = String::new();
    out.push_str("=== RSF occupancy ===\n");
    out.push_str(&format_loaded(dashboard));
    out.push('\n');
    out.push_str(&format_current(dashboard, config));
    out.push('\n');

    let smoothing = if config.smoothing.enabled {
        format!("EMA span {}", config.smoothing.span)
    } else {
        "off".to_string()
    };
    out.push_str(&format!(
        "Smoothing: {smoothing} | opening > {} | resample {}min\n",
        config.opening_threshold, config.resample_minutes
    ));

    if dashboard.today.is_empty() {
        out.push_str(&format!(
            "Today ({}) has not opened yet.\n",
            dashboard.today.date.format("%a %m/%d")
        ));
    } else if let Some(open) = dashboard.today.points.first() {
        out.push_str(&format!("Opened today at {}\n", fmt_minute(open.0)));
    }

    out.push_str(&format!(
        "Same-weekday history: {}\n",
        format_labels(&dashboard.history)
    ));

    out
}

fn format_labels(curves: &[DayCurve]) -> String {
    if curves.is_empty() {
        return "none".to_string();
    }
    curves
        .iter()
        .map(|c| c.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Daily peak table.
pub fn format_peaks(peaks: &[DailyPeak]) -> String {
    let mut out = String::new();
    out.push_str("Peak RSF occupancy by day:\n");
    out.push_str(&format!("{:<12} {:<4} {:>6} {:>6}\n", "date", "dow", "peak", "at"));
    out.push_str(&format!("{:-<12} {:-<4} {:->6} {:->6}\n", "", "", "", ""));

    for p in peaks {
        out.push_str(&format!(
            "{:<12} {:<4} {:>6} {:>6}\n",
            p.date.format("%Y-%m-%d").to_string(),
            p.date.format("%a").to_string(),
            p.peak,
            p.at.format("%H:%M").to_string(),
        ));
    }

    out
}

/// Render minutes since midnight as `HH:MM`.
pub fn fmt_minute(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as i64;
    let total = total.min(24 * 60 - 1);
    format!("{:02}:{:02}", total / 60, total % 60)
}
