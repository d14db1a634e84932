//! FILENAME: engine/src/error.rs
//! PURPOSE: Configuration errors and non-fatal data-quality warnings raised by the engines.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A statistic configuration that cannot be run.
/// Raised before any aggregation work begins.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("unknown {kind}: {value}")]
    Unknown { kind: &'static str, value: String },

    #[error("field '{field}' is not defined for {setting}")]
    UndefinedField { setting: &'static str, field: String },

    #[error("field '{0}' is listed more than once")]
    DuplicateField(String),

    #[error("invalid value for {setting}: {message}")]
    Invalid { setting: &'static str, message: String },

    #[error("comparison '{compare}' is not available at {granularity} granularity")]
    UnsupportedComparison { compare: String, granularity: String },

    #[error("malformed period key '{key}' for {granularity} granularity")]
    MalformedPeriod { key: String, granularity: String },
}

/// Why a value was left out of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The time field could not be parsed; the whole record was skipped.
    UnparseableTime,
    /// A statistic field held a non-empty, non-numeric value.
    NonNumeric,
}

/// Non-fatal data-quality report attached to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub field: String,
    pub kind: WarningKind,
    pub count: usize,
}

impl DataQualityWarning {
    pub fn new(field: impl Into<String>, kind: WarningKind, count: usize) -> Self {
        DataQualityWarning { field: field.into(), kind, count }
    }
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            WarningKind::UnparseableTime => {
                write!(f, "{} record(s) skipped: unparseable time in '{}'", self.count, self.field)
            }
            WarningKind::NonNumeric => {
                write!(f, "{} non-numeric value(s) ignored in '{}'", self.count, self.field)
            }
        }
    }
}
