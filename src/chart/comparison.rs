//! Value-vs-price comparison chart.
//!
//! The chart is built in memory from a [`ResultSeries`] and only touches
//! the filesystem when [`Chart::save_svg`] is called.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use plotters::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ChartSettings;
use crate::data::ResultSeries;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One line on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLine {
    pub label: String,
    pub color: [u8; 3],
    pub points: Vec<(NaiveDateTime, f64)>,
}

/// Two-line time-series chart sharing one coordinate frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub date_format: String,
    pub lines: Vec<ChartLine>,
}

/// Build the value/price overlay with default styling.
pub fn render_comparison(series: &ResultSeries) -> Chart {
    render_comparison_with(series, &ChartSettings::default())
}

/// Build the value/price overlay using `settings` for styling.
pub fn render_comparison_with(series: &ResultSeries, settings: &ChartSettings) -> Chart {
    let chart = Chart {
        title: settings.title.clone(),
        width: settings.width,
        height: settings.height,
        date_format: settings.date_format.clone(),
        lines: vec![
            ChartLine {
                label: "value".to_string(),
                color: settings.value_color,
                points: series.values().collect(),
            },
            ChartLine {
                label: "price".to_string(),
                color: settings.price_color,
                points: series.prices().collect(),
            },
        ],
    };
    debug!(points = series.len(), "Built comparison chart");
    chart
}

fn to_axis(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / 1000.0
}

fn axis_label(x: f64, fmt: &str) -> String {
    DateTime::<Utc>::from_timestamp_millis((x * 1000.0).round() as i64)
        .map(|dt| dt.naive_utc().format(fmt).to_string())
        .unwrap_or_default()
}

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

impl Chart {
    /// True when no line has any point.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.points.is_empty())
    }

    fn points(&self) -> impl Iterator<Item = &(NaiveDateTime, f64)> {
        self.lines.iter().flat_map(|l| l.points.iter())
    }

    /// Date span over all lines.
    pub fn x_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let min = self.points().map(|(d, _)| *d).min()?;
        let max = self.points().map(|(d, _)| *d).max()?;
        Some((min, max))
    }

    /// Value span over all lines.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        self.points().map(|(_, y)| *y).fold(None, |acc, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })
    }

    /// Plot coordinates, padded so that a single date or a flat line still
    /// gets a non-degenerate frame.
    fn frame(&self) -> ((f64, f64), (f64, f64)) {
        let (x0, x1) = match self.x_range() {
            Some((a, b)) if a < b => (to_axis(&a), to_axis(&b)),
            Some((a, _)) => (to_axis(&a) - SECONDS_PER_DAY, to_axis(&a) + SECONDS_PER_DAY),
            None => (0.0, SECONDS_PER_DAY),
        };
        let (y0, y1) = match self.y_range() {
            Some((lo, hi)) if lo < hi => {
                let pad = (hi - lo) * 0.05;
                (lo - pad, hi + pad)
            }
            Some((v, _)) => {
                let pad = (v.abs() * 0.05).max(1.0);
                (v - pad, v + pad)
            }
            None => (0.0, 1.0),
        };
        ((x0, x1), (y0, y1))
    }

    /// Render to an SVG document in memory.
    pub fn to_svg(&self) -> Result<String, ChartError> {
        let mut buf = String::new();
        {
            let root =
                SVGBackend::with_string(&mut buf, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let ((x0, x1), (y0, y1)) = self.frame();
            let mut ctx = ChartBuilder::on(&root)
                .caption(&self.title, ("sans-serif", 22))
                .margin(12)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x0..x1, y0..y1)
                .map_err(render_err)?;

            let date_format = self.date_format.as_str();
            let x_formatter = |x: &f64| axis_label(*x, date_format);
            ctx.configure_mesh()
                .x_labels(6)
                .y_labels(8)
                .x_label_formatter(&x_formatter)
                .x_desc("date")
                .draw()
                .map_err(render_err)?;

            for line in self.lines.iter().filter(|l| !l.points.is_empty()) {
                let [r, g, b] = line.color;
                let color = RGBColor(r, g, b);
                ctx.draw_series(LineSeries::new(
                    line.points.iter().map(|(d, y)| (to_axis(d), *y)),
                    color.stroke_width(2),
                ))
                .map_err(render_err)?
                .label(line.label.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }

            if !self.is_empty() {
                ctx.configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()
                    .map_err(render_err)?;
            }

            root.present().map_err(render_err)?;
        }
        Ok(buf)
    }

    /// Render and write an SVG file.
    pub fn save_svg(&self, path: impl AsRef<Path>) -> Result<(), ChartError> {
        let path = path.as_ref();
        let svg = self.to_svg()?;
        std::fs::write(path, svg)?;
        info!(path = %path.display(), "Wrote comparison chart");
        Ok(())
    }
}
