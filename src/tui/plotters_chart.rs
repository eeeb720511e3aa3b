//! Plotters-powered line chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.
//! The same widget draws the hourly overlay (many day curves plus a capacity line)
//! and the daily peak trend (one line with point markers).

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One line on the chart.
pub struct ChartSeries<'a> {
    pub points: &'a [(f64, f64)],
    pub color: RGBColor,
    /// Also mark every point with a colored pixel.
    pub markers: bool,
}

/// A render-only chart description; all series and bounds are computed outside
/// the render call.
pub struct OccupancyChart<'a> {
    /// Drawn in order, so later series sit on top.
    pub series: Vec<ChartSeries<'a>>,
    /// Optional horizontal reference line (capacity).
    pub reference: Option<(f64, RGBColor)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for OccupancyChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area; show a hint instead.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            if let Some((level, color)) = self.reference {
                chart.draw_series(LineSeries::new([(x0, level), (x1, level)], &color))?;
            }

            for s in &self.series {
                // Missing bins are NaN; each finite run is its own line.
                for run in s.points.split(|&(_, y)| !y.is_finite()) {
                    if !run.is_empty() {
                        chart.draw_series(LineSeries::new(run.iter().copied(), &s.color))?;
                    }
                }

                // `Pixel` rather than `Circle`: the ratatui backend maps circle radii
                // to canvas units and draws them far too large.
                if s.markers {
                    chart.draw_series(
                        s.points
                            .iter()
                            .filter(|&&(_, y)| y.is_finite())
                            .map(|&(x, y)| Pixel::new((x, y), s.color)),
                    )?;
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
