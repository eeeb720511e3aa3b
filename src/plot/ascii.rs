//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual checks when the full TUI is not wanted
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - capacity reference: `=` row
//! - past same-weekday days: one glyph per day from `HISTORY_GLYPHS`
//! - today: `#`, drawn last so it stays on top

use crate::domain::DayCurve;
use crate::report::fmt_minute;

const HISTORY_GLYPHS: [char; 6] = ['.', '+', 'x', 'o', '*', '~'];
const TODAY_GLYPH: char = '#';
const CAPACITY_GLYPH: char = '=';

/// Fallback x-range (06:00 to 23:00) when no curve has two distinct times.
const DEFAULT_MINUTES: (f64, f64) = (360.0, 1380.0);

/// Render today's curve over past same-weekday curves.
pub fn render_overlay(
    history: &[DayCurve],
    today: &DayCurve,
    capacity: i64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = || history.iter().chain(std::iter::once(today)).flat_map(|c| c.points.iter());
    let (t_min, t_max) = minute_range(all()).unwrap_or(DEFAULT_MINUTES);

    let y_top = all()
        .map(|&(_, y)| y)
        .filter(|y| y.is_finite())
        .fold(capacity as f64, f64::max);
    let y_max = if y_top > 0.0 { y_top * 1.05 } else { 1.0 };
    let y_min = 0.0;

    let mut grid = vec![vec![' '; width]; height];

    if capacity > 0 {
        let row = map_y(capacity as f64, y_min, y_max, height);
        for cell in grid[row].iter_mut() {
            *cell = CAPACITY_GLYPH;
        }
    }

    for (idx, curve) in history.iter().enumerate() {
        let glyph = HISTORY_GLYPHS[idx % HISTORY_GLYPHS.len()];
        draw_curve(&mut grid, &curve.points, t_min, t_max, y_min, y_max, glyph);
    }
    draw_curve(&mut grid, &today.points, t_min, t_max, y_min, y_max, TODAY_GLYPH);

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: time=[{}, {}] | count=[{y_min:.0}, {y_max:.0}]\n",
        fmt_minute(t_min),
        fmt_minute(t_max),
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    let left = fmt_minute(t_min);
    let right = fmt_minute(t_max);
    if width > left.len() + right.len() {
        out.push_str(&format!("{left}{right:>pad$}\n", pad = width - left.len()));
    }

    let mut legend = vec![format!("{TODAY_GLYPH} {}", today.label)];
    for (idx, curve) in history.iter().enumerate() {
        legend.push(format!("{} {}", HISTORY_GLYPHS[idx % HISTORY_GLYPHS.len()], curve.label));
    }
    out.push_str(&format!("Legend: {}\n", legend.join(", ")));

    out
}

fn minute_range<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> Option<(f64, f64)> {
    let mut min_t = f64::INFINITY;
    let mut max_t = f64::NEG_INFINITY;
    for &(t, _) in points {
        min_t = min_t.min(t);
        max_t = max_t.max(t);
    }
    if min_t.is_finite() && max_t.is_finite() && max_t > min_t {
        Some((min_t, max_t))
    } else {
        None
    }
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
    ch: char,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, ch),
            None => grid[yy][x] = ch,
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn curve(label: &str, points: Vec<(f64, f64)>) -> DayCurve {
        DayCurve {
            date: NaiveDate::from_ymd_opt(2022, 9, 13).unwrap(),
            label: label.to_string(),
            points,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let today = curve("today", vec![(420.0, 0.0), (1020.0, 100.0)]);
        let txt = render_overlay(&[], &today, 100, 10, 5);
        let expected = concat!(
            "Plot: time=[07:00, 17:00] | count=[0, 105]\n",
            "========##\n",
            "      ##  \n",
            "    ##    \n",
            "  ##      \n",
            "##        \n",
            "Legend: # today\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn history_glyphs_and_axis_labels() {
        let today = curve("today", vec![(420.0, 50.0), (480.0, 60.0)]);
        let past = curve("Tue 09/06", vec![(420.0, 20.0), (1380.0, 20.0)]);
        let txt = render_overlay(&[past], &today, 150, 40, 10);
        assert!(txt.contains("Legend: # today, . Tue 09/06"));
        assert!(txt.contains(&format!("07:00{:>35}", "23:00")));
        assert!(txt.lines().any(|l| l.chars().all(|c| c == '=')));
    }

    #[test]
    fn empty_today_still_renders_frame() {
        let today = curve("today", Vec::new());
        let txt = render_overlay(&[], &today, 150, 20, 5);
        assert!(txt.starts_with("Plot: time=[06:00, 23:00]"));
        assert_eq!(txt.lines().count(), 1 + 5 + 1 + 1);
    }
}
