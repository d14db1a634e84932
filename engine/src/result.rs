//! FILENAME: engine/src/result.rs
//! Statistic Result - The materialized output of one run.
//!
//! A result is a flat list of rows plus column descriptors. Rows are tagged
//! with a kind (normal, summary, subtotal, others, total); the kind is
//! metadata and never appears as a column.

use std::collections::BTreeMap;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use crate::error::DataQualityWarning;
use crate::value::{CellValue, FieldId};

/// Column holding the number of source records behind a row.
pub const RECORD_COUNT_COLUMN: &str = "record_count";

// ============================================================================
// FIELD REFERENCES
// ============================================================================

/// A source field plus the label it is displayed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub field_id: FieldId,
    #[serde(default)]
    pub label: String,
}

impl FieldRef {
    pub fn new(field_id: impl Into<FieldId>, label: impl Into<String>) -> Self {
        FieldRef { field_id: field_id.into(), label: label.into() }
    }

    /// The label, falling back to the field id when none was given.
    pub fn display(&self) -> &str {
        if self.label.is_empty() {
            &self.field_id
        } else {
            &self.label
        }
    }
}

// ============================================================================
// ROWS AND COLUMNS
// ============================================================================

/// Row-kind marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    #[default]
    Normal,
    /// Trailing summary of a time series.
    Summary,
    Subtotal,
    /// Top-N remainder folded into one row.
    Others,
    /// Grand total.
    Total,
}

impl RowKind {
    /// Rows that carry their own group's data rather than a roll-up.
    pub fn is_detail(self) -> bool {
        matches!(self, RowKind::Normal | RowKind::Others)
    }
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    #[serde(default)]
    pub kind: RowKind,
    pub values: BTreeMap<String, CellValue>,
    /// Whether the row's period has fully elapsed (time series only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
}

impl ResultRow {
    pub fn new(kind: RowKind) -> Self {
        ResultRow { kind, values: BTreeMap::new(), is_complete: None }
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Returns the cell for a column; absent columns read as null.
    pub fn get(&self, column: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_number()
    }
}

/// What a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Grouping or period label.
    Dimension,
    Value,
    Cumulative,
    Ratio,
    Delta,
    CumulativeRatio,
    RecordCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: String,
    pub label: String,
    pub role: ColumnRole,
}

impl ColumnDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, role: ColumnRole) -> Self {
        ColumnDescriptor { id: id.into(), label: label.into(), role }
    }
}

/// Summary of the input span covered by a result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRange {
    /// First period key (time series only).
    #[serde(default)]
    pub first_period: Option<String>,
    #[serde(default)]
    pub last_period: Option<String>,
    /// Records that contributed to the result.
    pub record_count: usize,
    /// Records skipped entirely (e.g. unparseable time).
    #[serde(default)]
    pub excluded_count: usize,
    /// Populated buckets or groups before any Top-N folding.
    #[serde(default)]
    pub group_count: usize,
}

/// Columns, rows and input span of one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticResult {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<ResultRow>,
    pub data_range: DataRange,
}

impl StatisticResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of a given kind, in emitted order.
    pub fn rows_of(&self, kind: RowKind) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(move |row| row.kind == kind)
    }
}

// ============================================================================
// RUN ENVELOPE
// ============================================================================

/// Per-run options supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    /// Reference instant for deciding whether a period is still in progress.
    pub now: NaiveDateTime,
}

impl RunOptions {
    pub fn at(now: NaiveDateTime) -> Self {
        RunOptions { now }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions { now: Local::now().naive_local() }
    }
}

/// A result plus the non-fatal warnings raised while computing it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOutput {
    pub result: StatisticResult,
    pub warnings: Vec<DataQualityWarning>,
}
