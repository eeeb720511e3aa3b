//! Day alignment: group samples by calendar date, find each day's opening, and
//! re-base days onto a shared minutes-since-midnight axis so they can be overlaid.
//!
//! All functions assume samples are in feed order (chronologically
//! non-decreasing); grouping sorts defensively per day.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::debug;

use crate::domain::{DailyPeak, DayCurve, Sample};

/// Label used for the current day's curve.
pub const TODAY_LABEL: &str = "today";

/// Most recent sample of the feed.
pub fn latest(samples: &[Sample]) -> Option<Sample> {
    samples.iter().copied().max_by_key(|s| s.at)
}

pub fn latest_date(samples: &[Sample]) -> Option<NaiveDate> {
    latest(samples).map(|s| s.date())
}

/// Samples recorded on `date`, in time order.
pub fn samples_on(samples: &[Sample], date: NaiveDate) -> Vec<Sample> {
    let mut out: Vec<Sample> = samples.iter().copied().filter(|s| s.date() == date).collect();
    out.sort_by_key(|s| s.at);
    out
}

/// Group samples by calendar date (ascending), each day sorted by time.
pub fn group_by_date(samples: &[Sample]) -> BTreeMap<NaiveDate, Vec<Sample>> {
    let mut days: BTreeMap<NaiveDate, Vec<Sample>> = BTreeMap::new();
    for s in samples {
        days.entry(s.date()).or_default().push(*s);
    }
    for day in days.values_mut() {
        day.sort_by_key(|s| s.at);
    }
    days
}

/// Max count per `bin_minutes` bin, labelled by bin start. Empty bins are omitted.
pub fn resample_max(samples: &[Sample], bin_minutes: u32) -> Vec<Sample> {
    let bin = bin_minutes.max(1);
    let mut bins: BTreeMap<NaiveDateTime, i64> = BTreeMap::new();
    for s in samples {
        let key = floor_to_bin(s.at, bin);
        bins.entry(key)
            .and_modify(|c| *c = (*c).max(s.count))
            .or_insert(s.count);
    }
    bins.into_iter().map(|(at, count)| Sample { at, count }).collect()
}

fn floor_to_bin(at: NaiveDateTime, bin_minutes: u32) -> NaiveDateTime {
    let minute_of_day = at.hour() * 60 + at.minute();
    let start = (minute_of_day / bin_minutes) * bin_minutes;
    // `start` < 1440, so this cannot fail.
    let time = NaiveTime::from_hms_opt(start / 60, start % 60, 0).unwrap_or(NaiveTime::MIN);
    at.date().and_time(time)
}

/// First sample whose count is strictly above `threshold`.
pub fn opening_time(samples: &[Sample], threshold: i64) -> Option<NaiveDateTime> {
    samples.iter().find(|s| s.count > threshold).map(|s| s.at)
}

/// Drop everything before the day's opening; empty when the day never opens.
pub fn trim_to_opening(samples: &[Sample], threshold: i64) -> &[Sample] {
    match samples.iter().position(|s| s.count > threshold) {
        Some(idx) => &samples[idx..],
        None => &[],
    }
}

/// Map samples onto `(minute_of_day, count)`.
pub fn rebase(samples: &[Sample]) -> Vec<(f64, f64)> {
    samples
        .iter()
        .map(|s| (s.minute_of_day(), s.count as f64))
        .collect()
}

/// Like [`rebase`] for resampled samples, with a NaN point for every empty bin
/// between two filled ones.
pub fn rebase_binned(samples: &[Sample], bin_minutes: u32) -> Vec<(f64, f64)> {
    let bin = f64::from(bin_minutes.max(1));
    let mut out = Vec::with_capacity(samples.len());
    let mut prev: Option<f64> = None;
    for s in samples {
        let minute = s.minute_of_day();
        if let Some(p) = prev {
            let mut gap = p + bin;
            while gap < minute {
                out.push((gap, f64::NAN));
                gap += bin;
            }
        }
        out.push((minute, s.count as f64));
        prev = Some(minute);
    }
    out
}

/// Today's curve at full resolution, starting at opening.
///
/// "Today" is the latest date present in the feed. The curve is empty when the
/// facility has not crossed the opening threshold yet.
pub fn today_curve(samples: &[Sample], threshold: i64) -> Option<DayCurve> {
    let date = latest_date(samples)?;
    let day = samples_on(samples, date);
    let points = rebase(trim_to_opening(&day, threshold));
    Some(DayCurve {
        date,
        label: TODAY_LABEL.to_string(),
        points,
    })
}

/// Resampled curves for every day sharing today's weekday, oldest first.
///
/// Today is included (resampled like the rest) alongside its full-resolution
/// curve. Days that never cross the opening threshold are skipped. Empty bins
/// after opening are NaN points.
pub fn same_weekday_curves(samples: &[Sample], threshold: i64, bin_minutes: u32) -> Vec<DayCurve> {
    let Some(today) = latest_date(samples) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (date, day) in group_by_date(samples) {
        if date.weekday() != today.weekday() {
            continue;
        }
        let resampled = resample_max(&day, bin_minutes);
        let opened = trim_to_opening(&resampled, threshold);
        if opened.is_empty() {
            debug!(%date, threshold, "skipping day without opening crossing");
            continue;
        }
        out.push(DayCurve {
            date,
            label: date.format("%a %m/%d").to_string(),
            points: rebase_binned(opened, bin_minutes),
        });
    }
    out
}

/// Peak count per day, ascending by date.
pub fn daily_peaks(samples: &[Sample]) -> Vec<DailyPeak> {
    group_by_date(samples)
        .into_iter()
        .filter_map(|(date, day)| {
            let mut best: Option<Sample> = None;
            for s in day {
                if best.is_none_or(|b| s.count > b.count) {
                    best = Some(s);
                }
            }
            best.map(|b| DailyPeak {
                date,
                peak: b.count,
                at: b.at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    fn day(y: i32, m: u32, d: u32, counts: &[(u32, u32, i64)]) -> Vec<Sample> {
        counts
            .iter()
            .map(|&(hh, mm, count)| Sample {
                at: at(y, m, d, hh, mm),
                count,
            })
            .collect()
    }

    #[test]
    fn resample_keeps_bin_max_and_skips_empty_bins() {
        let samples = day(2022, 9, 13, &[(7, 0, 3), (7, 4, 9), (7, 5, 1), (7, 21, 4)]);
        let out = resample_max(&samples, 5);
        assert_eq!(
            out,
            vec![
                Sample { at: at(2022, 9, 13, 7, 0), count: 9 },
                Sample { at: at(2022, 9, 13, 7, 5), count: 1 },
                Sample { at: at(2022, 9, 13, 7, 20), count: 4 },
            ]
        );
    }

    #[test]
    fn opening_is_first_strict_crossing() {
        let samples = day(2022, 9, 13, &[(6, 0, 5), (6, 30, 20), (7, 0, 21), (7, 30, 10)]);
        assert_eq!(opening_time(&samples, 20), Some(at(2022, 9, 13, 7, 0)));
        let trimmed = trim_to_opening(&samples, 20);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[1].count, 10);
    }

    #[test]
    fn day_without_crossing_trims_to_empty() {
        let samples = day(2022, 9, 13, &[(6, 0, 5), (6, 30, 20)]);
        assert_eq!(opening_time(&samples, 20), None);
        assert!(trim_to_opening(&samples, 20).is_empty());
    }

    #[test]
    fn today_curve_uses_latest_date_and_minutes() {
        let mut samples = day(2022, 9, 6, &[(7, 0, 40)]);
        samples.extend(day(2022, 9, 13, &[(6, 50, 2), (7, 1, 30), (7, 2, 35)]));

        let curve = today_curve(&samples, 20).unwrap();
        assert_eq!(curve.label, TODAY_LABEL);
        assert_eq!(curve.date, NaiveDate::from_ymd_opt(2022, 9, 13).unwrap());
        assert_eq!(curve.points, vec![(421.0, 30.0), (422.0, 35.0)]);
    }

    #[test]
    fn same_weekday_curves_select_matching_days() {
        // 2022-09-13 is a Tuesday; 09-06 and 08-30 are too, 09-12 is a Monday.
        let mut samples = day(2022, 8, 30, &[(7, 0, 10), (7, 3, 25), (7, 7, 30)]);
        samples.extend(day(2022, 9, 6, &[(7, 0, 5), (7, 1, 8)]));
        samples.extend(day(2022, 9, 12, &[(7, 0, 50)]));
        samples.extend(day(2022, 9, 13, &[(7, 0, 60)]));

        let curves = same_weekday_curves(&samples, 20, 5);
        let labels: Vec<&str> = curves.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Tue 08/30", "Tue 09/13"], "09-06 never opens, 09-12 is a Monday");
        assert_eq!(curves[0].points, vec![(420.0, 25.0), (425.0, 30.0)]);
        assert_eq!(curves[1].points, vec![(420.0, 60.0)]);
    }

    #[test]
    fn same_weekday_curves_include_resampled_today() {
        let mut samples = day(2022, 9, 6, &[(7, 0, 40)]);
        samples.extend(day(2022, 9, 13, &[(6, 58, 30), (7, 1, 35), (7, 3, 50), (7, 6, 45)]));

        let curves = same_weekday_curves(&samples, 20, 5);
        assert_eq!(curves.len(), 2);
        let today = &curves[1];
        assert_eq!(today.date, NaiveDate::from_ymd_opt(2022, 9, 13).unwrap());
        assert_eq!(today.label, "Tue 09/13");
        assert_eq!(today.points, vec![(415.0, 30.0), (420.0, 50.0), (425.0, 45.0)]);
    }

    #[test]
    fn empty_bins_after_opening_become_gaps() {
        let samples = day(2022, 9, 13, &[(7, 0, 25), (7, 17, 40), (7, 21, 35)]);
        let curves = same_weekday_curves(&samples, 20, 5);
        let points = &curves[0].points;

        let minutes: Vec<f64> = points.iter().map(|&(x, _)| x).collect();
        assert_eq!(minutes, vec![420.0, 425.0, 430.0, 435.0, 440.0]);
        assert_eq!(points[0].1, 25.0);
        assert!(points[1].1.is_nan() && points[2].1.is_nan());
        assert_eq!(points[3].1, 40.0);
        assert_eq!(points[4].1, 35.0);
    }

    #[test]
    fn daily_peaks_report_first_time_of_max() {
        let mut samples = day(2022, 9, 12, &[(9, 0, 80), (17, 0, 120), (18, 0, 120)]);
        samples.extend(day(2022, 9, 13, &[(9, 0, 60)]));

        let peaks = daily_peaks(&samples);
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].peak, 120);
        assert_eq!(peaks[0].at, at(2022, 9, 12, 17, 0));
        assert_eq!(peaks[1].date, NaiveDate::from_ymd_opt(2022, 9, 13).unwrap());
    }

    #[test]
    fn empty_feed_has_no_today() {
        assert!(today_curve(&[], 20).is_none());
        assert!(same_weekday_curves(&[], 20, 5).is_empty());
        assert!(latest(&[]).is_none());
    }
}
