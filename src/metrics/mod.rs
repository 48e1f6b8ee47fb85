//! Backtest result metrics.
//!
//! - Tracking error (end-of-run deviation over starting price)
//! - Maximum absolute deviation
//! - RMS relative deviation

pub mod calculator;

pub use calculator::{
    format_percentage, tracking_error, tracking_error_line, MetricsError, MetricsResult,
    TrackingSummary,
};
