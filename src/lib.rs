pub mod analyzer;
pub mod chart;
pub mod config;
pub mod data;
pub mod metrics;
pub mod validation;

// Re-export commonly used types
pub use analyzer::{analyze, AnalyzerError, BatchEntry, ResultAnalyzer};
pub use chart::{render_comparison, Chart, ChartError};
pub use config::AnalyzerConfig;
pub use data::{load, LoaderError, ResultRecord, ResultSeries};
pub use metrics::{tracking_error, MetricsError, TrackingSummary};
pub use validation::{OutputStructureValidator, StructureReport};
