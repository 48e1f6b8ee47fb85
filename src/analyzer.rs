//! End-to-end analysis of backtest result files.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::chart::{render_comparison_with, Chart, ChartError};
use crate::config::{AnalyzerConfig, ConfigError};
use crate::data::{self, LoaderError, ResultSeries};
use crate::metrics::{tracking_error, MetricsError, TrackingSummary};
use crate::validation::{OutputStructureValidator, StructureReport, ValidationError};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Tracking error and comparison chart for a result file, default styling.
pub fn analyze(path: impl AsRef<Path>) -> AnalyzerResult<(f64, Chart)> {
    ResultAnalyzer::default().analyze(path)
}

/// Outcome of one file in a folder summary.
#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub result: AnalyzerResult<TrackingSummary>,
}

impl BatchEntry {
    pub fn line(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        match &self.result {
            Ok(s) => format!(
                "{}: {} ({} records)",
                name,
                crate::metrics::tracking_error_line(s.tracking_error),
                s.records
            ),
            Err(e) => format!("{}: error: {}", name, e),
        }
    }

    /// `{"path": ..., "summary": {...}}` or `{"path": ..., "error": "..."}`.
    pub fn to_json(&self) -> serde_json::Value {
        let path = self.path.display().to_string();
        match &self.result {
            Ok(s) => serde_json::json!({ "path": path, "summary": s }),
            Err(e) => serde_json::json!({ "path": path, "error": e.to_string() }),
        }
    }
}

/// Runs the load, measure and chart steps with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct ResultAnalyzer {
    config: AnalyzerConfig,
}

impl ResultAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Build from a YAML config file, or defaults when `path` is `None`.
    pub fn from_config_file(path: Option<&Path>) -> AnalyzerResult<Self> {
        Ok(Self::new(AnalyzerConfig::load_or_default(path)?))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn load(&self, path: impl AsRef<Path>) -> AnalyzerResult<ResultSeries> {
        Ok(data::load(path)?)
    }

    pub fn chart(&self, series: &ResultSeries) -> Chart {
        render_comparison_with(series, &self.config.chart)
    }

    pub fn analyze(&self, path: impl AsRef<Path>) -> AnalyzerResult<(f64, Chart)> {
        let series = self.load(path)?;
        let te = tracking_error(&series)?;
        Ok((te, self.chart(&series)))
    }

    pub fn summarize(&self, path: impl AsRef<Path>) -> AnalyzerResult<TrackingSummary> {
        let series = self.load(path)?;
        Ok(TrackingSummary::from_series(&series)?)
    }

    /// Check that every file in `folder` carries the configured fields.
    pub fn check_folder(&self, folder: impl AsRef<Path>) -> AnalyzerResult<StructureReport> {
        let validator =
            OutputStructureValidator::new(self.config.validation.expected_fields.clone());
        Ok(validator.validate_folder(folder)?)
    }

    /// Summarise every `*.json` file in `folder`, in name order.
    ///
    /// A file that fails to load or measure is reported in its entry and
    /// does not stop the rest of the folder.
    pub fn summarize_folder(&self, folder: impl AsRef<Path>) -> AnalyzerResult<Vec<BatchEntry>> {
        let folder = folder.as_ref();
        let entries = fs::read_dir(folder).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoaderError::FileNotFound(folder.display().to_string()),
            _ => LoaderError::Io(e),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(LoaderError::Io)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let batch: Vec<BatchEntry> = paths
            .into_iter()
            .map(|path| {
                let result = self.summarize(&path);
                if let Err(e) = &result {
                    warn!(path = %path.display(), error = %e, "Skipping result file");
                }
                BatchEntry { path, result }
            })
            .collect();

        info!(
            folder = %folder.display(),
            files = batch.len(),
            failed = batch.iter().filter(|b| b.result.is_err()).count(),
            "Summarised result folder"
        );
        Ok(batch)
    }
}
