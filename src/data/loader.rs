//! Loader for backtest result files.
//!
//! A result file is a JSON document in one of two layouts:
//! - row-oriented: `[{"date": ..., "price": ..., "value": ...}, ...]`
//! - column-oriented: `{"date": [...], "price": [...], "value": [...]}`
//!
//! Both produce the same [`ResultSeries`], sorted by date.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use super::types::{ResultRecord, ResultSeries};

/// Fields every record must carry.
pub const REQUIRED_FIELDS: &[&str] = &["date", "price", "value"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a result file and sort it by date.
pub fn load(path: impl AsRef<Path>) -> Result<ResultSeries, LoaderError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoaderError::FileNotFound(path.display().to_string()),
        _ => LoaderError::Io(e),
    })?;

    let doc: Value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        if e.is_io() {
            LoaderError::Io(e.into())
        } else {
            LoaderError::MalformedInput(format!("{}: invalid JSON: {}", path.display(), e))
        }
    })?;

    let series = from_value(doc)?;
    info!(
        path = %path.display(),
        records = series.len(),
        "Loaded backtest results"
    );
    Ok(series)
}

/// Parse a result document held in memory.
pub fn load_from_str(json: &str) -> Result<ResultSeries, LoaderError> {
    let doc: Value = serde_json::from_str(json)
        .map_err(|e| LoaderError::MalformedInput(format!("invalid JSON: {}", e)))?;
    from_value(doc)
}

/// Write a series as a row-oriented JSON array.
pub fn save(series: &ResultSeries, path: impl AsRef<Path>) -> Result<(), LoaderError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, series)
        .map_err(|e| LoaderError::Io(e.into()))?;
    writer.flush()?;
    debug!(path = %path.display(), records = series.len(), "Saved backtest results");
    Ok(())
}

fn from_value(doc: Value) -> Result<ResultSeries, LoaderError> {
    let rows = match doc {
        Value::Array(rows) => rows,
        Value::Object(columns) => columns_to_rows(columns)?,
        other => {
            return Err(LoaderError::MalformedInput(format!(
                "expected an array of records or an object of columns, found {}",
                json_kind(&other)
            )))
        }
    };

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            serde_json::from_value::<ResultRecord>(row)
                .map_err(|e| LoaderError::MalformedInput(format!("record {}: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResultSeries::new(records))
}

/// Transpose `{"field": [v0, v1, ...]}` into `[{"field": v0}, {"field": v1}, ...]`.
fn columns_to_rows(columns: Map<String, Value>) -> Result<Vec<Value>, LoaderError> {
    for field in REQUIRED_FIELDS {
        if !columns.contains_key(*field) {
            return Err(LoaderError::MalformedInput(format!(
                "missing column `{}`",
                field
            )));
        }
    }

    let mut len: Option<usize> = None;
    let mut arrays = Vec::with_capacity(columns.len());
    for (name, column) in columns {
        let Value::Array(items) = column else {
            return Err(LoaderError::MalformedInput(format!(
                "column `{}` is not an array",
                name
            )));
        };
        match len {
            None => len = Some(items.len()),
            Some(n) if n != items.len() => {
                return Err(LoaderError::MalformedInput(format!(
                    "column `{}` has {} entries, expected {}",
                    name,
                    items.len(),
                    n
                )))
            }
            Some(_) => {}
        }
        arrays.push((name, items));
    }

    let mut rows: Vec<Map<String, Value>> = (0..len.unwrap_or(0)).map(|_| Map::new()).collect();
    for (name, items) in arrays {
        for (row, item) in rows.iter_mut().zip(items) {
            row.insert(name.clone(), item);
        }
    }

    Ok(rows.into_iter().map(Value::Object).collect())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
