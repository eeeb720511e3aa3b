//! Ratatui-based terminal dashboard.
//!
//! The TUI shows today's occupancy over past same-weekday days, a settings panel
//! for the trailing window and smoothing, and an optional daily-peak trend chart.
//! It reloads every few seconds; the feed memo keeps actual downloads rare.

use std::io;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};
use tracing::{info, warn};

use crate::app::pipeline::{Dashboard, load_dashboard};
use crate::data::{FeedCache, FeedClient};
use crate::domain::{
    DailyPeak, DayCurve, MAX_EMA_SPAN, MAX_TRUNCATE_WEEKS, MIN_EMA_SPAN, ReportConfig,
};
use crate::error::AppError;
use crate::report::{fmt_minute, format_chart_title, format_current, format_loaded};

mod plotters_chart;

use plotters_chart::{ChartSeries, OccupancyChart};

/// How often the dashboard reloads (through the feed memo).
const AUTO_REFRESH: Duration = Duration::from_secs(10);

const SETTINGS_COUNT: usize = 3;

const HISTORY_PALETTE: [(u8, u8, u8); 6] = [
    (0, 255, 255),   // cyan
    (0, 200, 0),     // green
    (255, 215, 0),   // gold
    (255, 0, 255),   // magenta
    (80, 160, 255),  // blue
    (255, 140, 0),   // orange
];
const TODAY_COLOR: (u8, u8, u8) = (255, 255, 255);
const CAPACITY_COLOR: (u8, u8, u8) = (255, 0, 0);
const PEAK_COLOR: (u8, u8, u8) = (0, 255, 255);

/// Start the TUI.
pub fn run(config: ReportConfig) -> Result<(), AppError> {
    let client = FeedClient::new(config.feed_url.clone())?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::io(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, client);
    terminal
        .draw(|f| app.draw(f))
        .map_err(|e| AppError::io(format!("Terminal draw error: {e}")))?;
    app.reload(false);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::io(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::io(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    config: ReportConfig,
    client: FeedClient,
    cache: FeedCache,
    dashboard: Option<Dashboard>,
    selected_field: usize,
    show_peaks: bool,
    status: String,
    last_reload: Instant,
}

impl App {
    fn new(config: ReportConfig, client: FeedClient) -> Self {
        Self {
            config,
            client,
            cache: FeedCache::default(),
            dashboard: None,
            selected_field: 0,
            show_peaks: false,
            status: "Loading data...".to_string(),
            last_reload: Instant::now(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.last_reload.elapsed() >= AUTO_REFRESH {
                self.reload(false);
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::io(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::io(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::io(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < SETTINGS_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('e') => {
                self.config.smoothing.enabled = !self.config.smoothing.enabled;
                self.reload(false);
            }
            KeyCode::Char('h') => {
                self.show_peaks = !self.show_peaks;
            }
            KeyCode::Char('r') => self.reload(true),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.selected_field {
            0 => {
                let weeks = self.config.truncate_weeks;
                self.config.truncate_weeks = if delta >= 0 {
                    (weeks + 1).min(MAX_TRUNCATE_WEEKS)
                } else {
                    weeks.saturating_sub(1)
                };
            }
            1 => {
                self.config.smoothing.enabled = !self.config.smoothing.enabled;
            }
            2 => {
                let span = self.config.smoothing.span;
                self.config.smoothing.span = if delta >= 0 {
                    (span + 1).min(MAX_EMA_SPAN)
                } else {
                    span.saturating_sub(1).max(MIN_EMA_SPAN)
                };
            }
            _ => return,
        }
        self.reload(false);
    }

    /// Rebuild the dashboard; `force` bypasses the feed memo.
    ///
    /// Failures are reported in the status bar and keep the previous dashboard.
    fn reload(&mut self, force: bool) {
        if force {
            self.cache.invalidate();
        }
        self.last_reload = Instant::now();

        match load_dashboard(&mut self.cache, &self.client, &self.config) {
            Ok(dashboard) => {
                info!(
                    records = dashboard.record_count,
                    history_days = dashboard.history.len(),
                    "dashboard reloaded"
                );
                self.status = format!("Updated {}", chrono::Local::now().format("%H:%M:%S"));
                self.dashboard = Some(dashboard);
            }
            Err(err) => {
                warn!(error = %err, "dashboard reload failed");
                self.status = format!("Error: {err}");
            }
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("rsf", Style::default().fg(Color::Cyan)),
            Span::raw(" RSF occupancy"),
        ]));

        match &self.dashboard {
            Some(dash) => {
                lines.push(Line::from(Span::styled(
                    format_current(dash, &self.config),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(Span::styled(
                    format_loaded(dash),
                    Style::default().fg(Color::Gray),
                )));
            }
            None => {
                lines.push(Line::from(Span::styled(
                    "No data yet.",
                    Style::default().fg(Color::Yellow),
                )));
            }
        }

        let p = Paragraph::new(Text::from(lines));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(5)])
            .split(area);

        let charts = if self.show_peaks {
            Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(rows[0])
        } else {
            Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0)])
                .split(rows[0])
        };

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(20)])
            .split(charts[0]);

        self.draw_overlay_chart(frame, top[0]);
        self.draw_legend(frame, top[1]);
        if self.show_peaks {
            self.draw_peaks_chart(frame, charts[1]);
        }
        self.draw_settings(frame, rows[1]);
    }

    fn draw_overlay_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(format_chart_title(&self.config))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(dash) = &self.dashboard else {
            render_waiting(frame, inner);
            return;
        };

        let (x_bounds, y_bounds) = overlay_bounds(&dash.history, &dash.today, self.config.capacity);

        let mut series: Vec<ChartSeries<'_>> = dash
            .history
            .iter()
            .enumerate()
            .map(|(idx, c)| ChartSeries {
                points: &c.points,
                color: rgb(history_color(idx)),
                markers: false,
            })
            .collect();
        series.push(ChartSeries {
            points: &dash.today.points,
            color: rgb(TODAY_COLOR),
            markers: true,
        });

        let (chart_rect, insets) = chart_layout(inner);
        let widget = OccupancyChart {
            series,
            reference: Some((self.config.capacity as f64, rgb(CAPACITY_COLOR))),
            x_bounds,
            y_bounds,
            x_label: "time of day",
            y_label: "people",
            fmt_x: fmt_minute,
            fmt_y: fmt_count,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(
                frame,
                inner,
                chart_rect,
                insets,
                AxisSpec {
                    x_bounds,
                    y_bounds,
                    fmt_x: fmt_minute,
                    fmt_y: fmt_count,
                    x_label: "time of day",
                    y_label: "people",
                },
            );
        }
    }

    fn draw_peaks_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title("Peak RSF occupancy by day")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(dash) = &self.dashboard else {
            render_waiting(frame, inner);
            return;
        };

        let (points, x_bounds, y_bounds) = peak_series(&dash.peaks);
        let (chart_rect, insets) = chart_layout(inner);
        let widget = OccupancyChart {
            series: vec![ChartSeries {
                points: &points,
                color: rgb(PEAK_COLOR),
                markers: true,
            }],
            reference: None,
            x_bounds,
            y_bounds,
            x_label: "date",
            y_label: "peak",
            fmt_x: fmt_day_number,
            fmt_y: fmt_count,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(
                frame,
                inner,
                chart_rect,
                insets,
                AxisSpec {
                    x_bounds,
                    y_bounds,
                    fmt_x: fmt_day_number,
                    fmt_y: fmt_count,
                    x_label: "date",
                    y_label: "peak",
                },
            );
        }
    }

    fn draw_legend(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut items = Vec::new();
        if let Some(dash) = &self.dashboard {
            items.push(ListItem::new(Line::from(vec![
                Span::styled("━━ ", Style::default().fg(color(TODAY_COLOR))),
                Span::styled(
                    dash.today.label.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ])));
            for (idx, c) in dash.history.iter().enumerate().rev() {
                items.push(ListItem::new(Line::from(vec![
                    Span::styled("── ", Style::default().fg(color(history_color(idx)))),
                    Span::raw(c.label.clone()),
                ])));
            }
            items.push(ListItem::new(Line::from(vec![
                Span::styled("── ", Style::default().fg(color(CAPACITY_COLOR))),
                Span::raw(format!("capacity {}", self.config.capacity)),
            ])));
        }

        let list = List::new(items).block(Block::default().title("Legend").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let weeks = if self.config.truncate_weeks == 0 {
            "all".to_string()
        } else {
            self.config.truncate_weeks.to_string()
        };
        let ema = if self.config.smoothing.enabled { "on" } else { "off" };

        let items = vec![
            ListItem::new(format!("Truncate weeks: {weeks}")),
            ListItem::new(format!("Apply EMA: {ema}")),
            ListItem::new(format!("EMA span: {}", self.config.smoothing.span)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  e EMA  h history  r refresh  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn render_waiting(frame: &mut ratatui::Frame<'_>, area: Rect) {
    let msg = Paragraph::new("Waiting for data...")
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default());
    frame.render_widget(msg, area);
}

fn history_color(idx: usize) -> (u8, u8, u8) {
    HISTORY_PALETTE[idx % HISTORY_PALETTE.len()]
}

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

fn color((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

/// X bounds span every plotted minute; Y runs from zero to just above the larger
/// of the busiest point and capacity.
fn overlay_bounds(history: &[DayCurve], today: &DayCurve, capacity: i64) -> ([f64; 2], [f64; 2]) {
    let mut t0 = f64::INFINITY;
    let mut t1 = f64::NEG_INFINITY;
    let mut y_top = capacity as f64;
    for &(t, y) in history.iter().chain(std::iter::once(today)).flat_map(|c| c.points.iter()) {
        t0 = t0.min(t);
        t1 = t1.max(t);
        if y.is_finite() {
            y_top = y_top.max(y);
        }
    }

    if !t0.is_finite() || !t1.is_finite() || t1 <= t0 {
        t0 = 360.0;
        t1 = 1380.0;
    }
    if !(y_top.is_finite() && y_top > 0.0) {
        y_top = 1.0;
    }

    ([t0, t1], [0.0, y_top * 1.05])
}

/// Daily peaks on a day-number axis (days since the common era).
fn peak_series(peaks: &[DailyPeak]) -> (Vec<(f64, f64)>, [f64; 2], [f64; 2]) {
    use chrono::Datelike;

    let points: Vec<(f64, f64)> = peaks
        .iter()
        .map(|p| (p.date.num_days_from_ce() as f64, p.peak as f64))
        .collect();

    let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y_top = 0.0_f64;
    for &(x, y) in &points {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y_top = y_top.max(y);
    }
    if !x0.is_finite() || !x1.is_finite() {
        x0 = 0.0;
        x1 = 1.0;
    }
    if x1 <= x0 {
        x0 -= 1.0;
        x1 += 1.0;
    }
    if y_top <= 0.0 {
        y_top = 1.0;
    }

    (points, [x0, x1], [0.0, y_top * 1.05])
}

fn fmt_count(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_day_number(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%b %d").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

struct AxisSpec<'a> {
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    fmt_x: fn(f64) -> String,
    fmt_y: fn(f64) -> String,
    x_label: &'a str,
    y_label: &'a str,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    axis: AxisSpec<'_>,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = axis.x_bounds[0] + u * (axis.x_bounds[1] - axis.x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = (axis.fmt_x)(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = axis.y_bounds[0] + u * (axis.y_bounds[1] - axis.y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = (axis.fmt_y)(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new(axis.x_label)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new(axis.y_label)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn curve(points: Vec<(f64, f64)>) -> DayCurve {
        DayCurve {
            date: NaiveDate::from_ymd_opt(2022, 9, 13).unwrap(),
            label: "today".to_string(),
            points,
        }
    }

    #[test]
    fn overlay_bounds_cover_curves_and_capacity() {
        let today = curve(vec![(420.0, 40.0), (600.0, 170.0)]);
        let past = vec![curve(vec![(400.0, 20.0), (1300.0, 30.0)])];
        let (x, y) = overlay_bounds(&past, &today, 150);
        assert_eq!(x, [400.0, 1300.0]);
        assert_eq!(y[0], 0.0);
        assert!((y[1] - 170.0 * 1.05).abs() < 1e-9);

        let (x, y) = overlay_bounds(&[], &curve(Vec::new()), 150);
        assert_eq!(x, [360.0, 1380.0]);
        assert!((y[1] - 157.5).abs() < 1e-9);
    }

    #[test]
    fn peak_series_uses_day_numbers() {
        let date = NaiveDate::from_ymd_opt(2022, 9, 13).unwrap();
        let at = date.and_hms_opt(17, 0, 0).unwrap();
        let (points, x, _) = peak_series(&[DailyPeak { date, peak: 120, at }]);
        assert_eq!(points.len(), 1);
        assert_eq!(x[1] - x[0], 2.0);
        assert_eq!(fmt_day_number(points[0].0), "Sep 13");
    }

    #[test]
    fn keys_toggle_view_and_quit() {
        let client = FeedClient::new("http://127.0.0.1:9/feed.jsonl").unwrap();
        let mut app = App::new(ReportConfig::default(), client);

        assert!(!app.handle_key(KeyCode::Char('h')));
        assert!(app.show_peaks);
        assert!(!app.handle_key(KeyCode::Down));
        assert!(!app.handle_key(KeyCode::Down));
        assert!(!app.handle_key(KeyCode::Down));
        assert_eq!(app.selected_field, SETTINGS_COUNT - 1);
        assert!(app.handle_key(KeyCode::Char('q')));
    }
}
