//! Tracking error calculator.
//!
//! Measures how far the replicating portfolio ended up from the
//! instrument it was hedging, relative to the instrument's starting price.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::data::ResultSeries;

#[derive(Error, Debug, PartialEq)]
pub enum MetricsError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero: first price is zero, tracking error is undefined")]
    DivisionByZero,
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Tracking error of a series.
///
/// `(value[last] - price[last]) / price[first]`, with first and last taken
/// chronologically. A single record serves as both endpoints.
pub fn tracking_error(series: &ResultSeries) -> MetricsResult<f64> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(MetricsError::InsufficientData(
                "tracking error needs at least one record".to_string(),
            ))
        }
    };

    if first.price == 0.0 {
        return Err(MetricsError::DivisionByZero);
    }

    let te = (last.value - last.price) / first.price;
    debug!(
        first_price = first.price,
        last_price = last.price,
        last_value = last.value,
        tracking_error = te,
        "Computed tracking error"
    );
    Ok(te)
}

/// Render a tracking error ratio as a two-decimal percentage.
pub fn format_percentage(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// The line printed after an analysis run.
pub fn tracking_error_line(ratio: f64) -> String {
    format!("Tracking error: {}", format_percentage(ratio))
}

/// Deviation statistics over a whole backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSummary {
    pub records: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,

    pub first_price: f64,
    pub last_price: f64,
    pub last_value: f64,

    /// End-of-run deviation normalised by the first price
    pub tracking_error: f64,

    /// Largest `|value - price|` on any date
    pub max_abs_deviation: f64,
    pub max_abs_deviation_date: NaiveDateTime,

    /// Root mean square of `(value - price) / first_price`
    pub rms_relative_deviation: f64,
}

impl TrackingSummary {
    /// Summarise a series. Fails under the same conditions as [`tracking_error`].
    pub fn from_series(series: &ResultSeries) -> MetricsResult<Self> {
        let tracking_error = tracking_error(series)?;
        // tracking_error succeeded, so both endpoints exist.
        let (first, last) = match (series.first(), series.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(MetricsError::InsufficientData("empty series".to_string())),
        };

        let mut max_abs_deviation = 0.0;
        let mut max_abs_deviation_date = first.date;
        let mut sum_sq = 0.0;
        for record in series {
            let dev = record.deviation();
            if dev.abs() > max_abs_deviation {
                max_abs_deviation = dev.abs();
                max_abs_deviation_date = record.date;
            }
            sum_sq += (dev / first.price).powi(2);
        }

        Ok(Self {
            records: series.len(),
            start: first.date,
            end: last.date,
            first_price: first.price,
            last_price: last.price,
            last_value: last.value,
            tracking_error,
            max_abs_deviation,
            max_abs_deviation_date,
            rms_relative_deviation: (sum_sq / series.len() as f64).sqrt(),
        })
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        format!(
            "Tracking Summary\n\
             ================\n\
             \n\
             Records: {}\n\
             Period: {} to {}\n\
             \n\
             First Price: {:.4}\n\
             Last Price: {:.4}\n\
             Last Value: {:.4}\n\
             \n\
             {}\n\
             Max Abs Deviation: {:.4} ({})\n\
             RMS Relative Deviation: {}",
            self.records,
            self.start.date(),
            self.end.date(),
            self.first_price,
            self.last_price,
            self.last_value,
            tracking_error_line(self.tracking_error),
            self.max_abs_deviation,
            self.max_abs_deviation_date.date(),
            format_percentage(self.rms_relative_deviation),
        )
    }
}
