//! Analyzer configuration.
//!
//! ```yaml
//! chart:
//!   title: "Portfolio value vs theoretical price"
//!   width: 1024
//!   height: 600
//!   value_color: [31, 119, 180]
//!   price_color: [214, 39, 40]
//!   date_format: "%Y-%m-%d"
//! validation:
//!   expected_fields: [date, value, deltas, deltasStdDev, price, priceStdDev]
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fields the backtest console writes for every date.
pub const DEFAULT_EXPECTED_FIELDS: &[&str] =
    &["date", "value", "deltas", "deltasStdDev", "price", "priceStdDev"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub value_color: [u8; 3],
    pub price_color: [u8; 3],
    /// strftime layout for x-axis labels
    pub date_format: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            title: "Portfolio value vs theoretical price".to_string(),
            width: 1024,
            height: 600,
            value_color: [31, 119, 180],
            price_color: [214, 39, 40],
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub expected_fields: Vec<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            expected_fields: DEFAULT_EXPECTED_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub chart: ChartSettings,
    pub validation: ValidationSettings,
}

impl AnalyzerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
