//! Structure validation for backtest output folders.
//!
//! Every file in the folder must parse as JSON and carry the expected
//! fields (camelCased): `date`, `value`, `deltas`, `deltasStdDev`,
//! `price`, `priceStdDev`. Row-oriented files must have each field on
//! every row; column-oriented files must have each field as a key.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DEFAULT_EXPECTED_FIELDS;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Folder not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Outcome of checking one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Ok,
    MissingFields(Vec<String>),
    Unparseable(String),
}

/// Result of checking a single output file.
#[derive(Debug, Clone)]
pub struct FileCheck {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl FileCheck {
    pub fn passed(&self) -> bool {
        self.outcome == FileOutcome::Ok
    }

    /// Status in the grading script's wording, one line per missing field.
    pub fn message(&self) -> String {
        match &self.outcome {
            FileOutcome::Ok => "--> OK".to_string(),
            FileOutcome::MissingFields(fields) => fields
                .iter()
                .map(|f| {
                    format!(
                        "** Warning: missing field {}. Make sure the field names are camelcased.",
                        f
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            FileOutcome::Unparseable(reason) => format!("Unable to parse json file: {}", reason),
        }
    }

    /// `File <path>` followed by each status line, all indented two spaces.
    pub fn report_lines(&self) -> Vec<String> {
        std::iter::once(format!("File {}", self.path.display()))
            .chain(self.message().lines().map(str::to_string))
            .map(|line| format!("  {}", line))
            .collect()
    }
}

/// Structure report for one output folder.
#[derive(Debug)]
pub struct StructureReport {
    pub folder: PathBuf,
    pub files: Vec<FileCheck>,
}

impl StructureReport {
    pub fn all_passed(&self) -> bool {
        self.files.iter().all(|f| f.passed())
    }

    pub fn failed_checks(&self) -> Vec<&FileCheck> {
        self.files.iter().filter(|f| !f.passed()).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.files.iter().filter(|f| f.passed()).count();
        format!(
            "{}: {}/{} files have the expected structure",
            self.folder.display(),
            passed,
            self.files.len()
        )
    }
}

/// Checks backtest output files for the expected fields.
pub struct OutputStructureValidator {
    expected_fields: Vec<String>,
}

impl Default for OutputStructureValidator {
    fn default() -> Self {
        Self::new(DEFAULT_EXPECTED_FIELDS.iter().map(|f| f.to_string()).collect())
    }
}

impl OutputStructureValidator {
    pub fn new(expected_fields: Vec<String>) -> Self {
        Self { expected_fields }
    }

    pub fn expected_fields(&self) -> &[String] {
        &self.expected_fields
    }

    /// Check every regular file in `folder`, in file-name order.
    pub fn validate_folder(&self, folder: impl AsRef<Path>) -> ValidationResult<StructureReport> {
        let folder = folder.as_ref();
        let entries = fs::read_dir(folder).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ValidationError::FileNotFound(folder.display().to_string()),
            _ => ValidationError::Io(e),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let files: Vec<FileCheck> = paths.into_iter().map(|p| self.validate_file(p)).collect();
        let report = StructureReport {
            folder: folder.to_path_buf(),
            files,
        };
        info!(
            folder = %folder.display(),
            files = report.files.len(),
            failed = report.failed_checks().len(),
            "Checked output structure"
        );
        Ok(report)
    }

    /// Check a single file. Read and parse failures are reported, not raised.
    pub fn validate_file(&self, path: impl Into<PathBuf>) -> FileCheck {
        let path = path.into();
        let outcome = match File::open(&path) {
            Ok(file) => match serde_json::from_reader::<_, Value>(BufReader::new(file)) {
                Ok(doc) => self.validate_document(&doc),
                Err(e) => FileOutcome::Unparseable(e.to_string()),
            },
            Err(e) => FileOutcome::Unparseable(e.to_string()),
        };
        if outcome != FileOutcome::Ok {
            warn!(path = %path.display(), ?outcome, "Output file failed structure check");
        }
        FileCheck { path, outcome }
    }

    /// Check an already-parsed document.
    pub fn validate_document(&self, doc: &Value) -> FileOutcome {
        let present: BTreeSet<&str> = match doc {
            Value::Array(rows) => {
                let mut rows = rows.iter();
                let Some(first) = rows.next() else {
                    return self.missing(&BTreeSet::new());
                };
                let mut common = keys_of(first);
                for row in rows {
                    let keys = keys_of(row);
                    common.retain(|k| keys.contains(k));
                }
                common
            }
            Value::Object(columns) => columns.keys().map(String::as_str).collect(),
            _ => {
                return FileOutcome::Unparseable(
                    "expected an array of records or an object of columns".to_string(),
                )
            }
        };
        self.missing(&present)
    }

    fn missing(&self, present: &BTreeSet<&str>) -> FileOutcome {
        let missing: Vec<String> = self
            .expected_fields
            .iter()
            .filter(|f| !present.contains(f.as_str()))
            .cloned()
            .collect();
        if missing.is_empty() {
            FileOutcome::Ok
        } else {
            FileOutcome::MissingFields(missing)
        }
    }
}

fn keys_of(row: &Value) -> BTreeSet<&str> {
    match row {
        Value::Object(map) => map.keys().map(String::as_str).collect(),
        _ => BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_row() -> Value {
        json!({
            "date": "2024-01-01",
            "value": 10.5,
            "deltas": [0.4],
            "deltasStdDev": [0.01],
            "price": 10.0,
            "priceStdDev": 0.02
        })
    }

    #[test]
    fn test_complete_rows_pass() {
        let validator = OutputStructureValidator::default();
        let doc = Value::Array(vec![full_row(), full_row()]);
        assert_eq!(validator.validate_document(&doc), FileOutcome::Ok);
    }

    #[test]
    fn test_field_missing_from_one_row() {
        let validator = OutputStructureValidator::default();
        let mut partial = full_row();
        partial.as_object_mut().unwrap().remove("priceStdDev");
        let doc = Value::Array(vec![full_row(), partial]);
        assert_eq!(
            validator.validate_document(&doc),
            FileOutcome::MissingFields(vec!["priceStdDev".to_string()])
        );
    }

    #[test]
    fn test_snake_case_fields_are_missing() {
        let validator = OutputStructureValidator::default();
        let doc = json!([{
            "date": "2024-01-01",
            "value": 1.0,
            "deltas": [0.4],
            "deltas_std_dev": [0.01],
            "price": 1.0,
            "price_std_dev": 0.02
        }]);
        assert_eq!(
            validator.validate_document(&doc),
            FileOutcome::MissingFields(vec!["deltasStdDev".to_string(), "priceStdDev".to_string()])
        );
    }

    #[test]
    fn test_columns_checked_by_key() {
        let validator = OutputStructureValidator::new(vec!["date".into(), "price".into()]);
        let doc = json!({"date": ["2024-01-01"], "price": [1.0]});
        assert_eq!(validator.validate_document(&doc), FileOutcome::Ok);
    }

    #[test]
    fn test_empty_array_misses_everything() {
        let validator = OutputStructureValidator::new(vec!["date".into()]);
        assert_eq!(
            validator.validate_document(&json!([])),
            FileOutcome::MissingFields(vec!["date".to_string()])
        );
    }

    #[test]
    fn test_scalar_document_unparseable() {
        let validator = OutputStructureValidator::default();
        assert!(matches!(
            validator.validate_document(&json!(3)),
            FileOutcome::Unparseable(_)
        ));
    }

    #[test]
    fn test_report_lines_indent_every_warning() {
        let check = FileCheck {
            path: PathBuf::from("out/a.json"),
            outcome: FileOutcome::MissingFields(vec![
                "deltasStdDev".to_string(),
                "priceStdDev".to_string(),
            ]),
        };
        let lines = check.report_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!("  File {}", PathBuf::from("out/a.json").display()));
        assert!(lines.iter().all(|l| l.starts_with("  ")));
        assert!(lines[2].starts_with("  ** Warning: missing field priceStdDev."));
    }

    #[test]
    fn test_message_wording() {
        let check = FileCheck {
            path: PathBuf::from("a.json"),
            outcome: FileOutcome::MissingFields(vec!["deltas".to_string()]),
        };
        assert!(!check.passed());
        assert_eq!(
            check.message(),
            "** Warning: missing field deltas. Make sure the field names are camelcased."
        );
    }
}
