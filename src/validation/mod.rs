//! Validation of backtest output files.
//!
//! Checks that every result file in an output folder parses as JSON and
//! carries the camelCased fields the backtest console is expected to write.

pub mod output_structure;

pub use output_structure::{
    FileCheck, FileOutcome, OutputStructureValidator, StructureReport, ValidationError,
    ValidationResult,
};
