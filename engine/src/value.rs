//! FILENAME: engine/src/value.rs
//! PURPOSE: Scalar values flowing into and out of the statistic engines.
//! CONTEXT: Records come from an external form store (or from another
//! statistic's stored rows) as flat field-id -> scalar mappings. Result rows
//! go back out as column-id -> cell mappings tagged with a row kind.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Identifier of a field inside a source record.
pub type FieldId = String;

/// Label used for a missing or blank grouping value.
pub const EMPTY_LABEL: &str = "(empty)";

// ============================================================================
// INPUT VALUES
// ============================================================================

/// A scalar value read from a source record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// True for missing values and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Coerces the value to a finite number.
    /// Numeric text is accepted; booleans and everything else are not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// The label this value groups under.
    pub fn group_label(&self) -> String {
        match self {
            FieldValue::Empty => EMPTY_LABEL.to_string(),
            FieldValue::Text(s) if s.trim().is_empty() => EMPTY_LABEL.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Boolean(b) => b.to_string(),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// Renders integral numbers without a trailing ".0".
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A flat source record: field id -> value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<FieldId, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Record { values: BTreeMap::new() }
    }

    /// Builds a record from (field, value) pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<FieldId>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Record {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn set(&mut self, field: impl Into<FieldId>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    /// Returns the value of a field. Missing fields read as `Empty`.
    pub fn get(&self, field: &str) -> &FieldValue {
        static EMPTY: FieldValue = FieldValue::Empty;
        self.values.get(field).unwrap_or(&EMPTY)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// OUTPUT VALUES
// ============================================================================

/// A value in a result row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(CellValue::Null, CellValue::Number)
    }
}

impl From<&CellValue> for FieldValue {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Null => FieldValue::Empty,
            CellValue::Number(n) => FieldValue::Number(*n),
            CellValue::Text(s) => FieldValue::Text(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(FieldValue::Number(3.5).as_number(), Some(3.5));
        assert_eq!(FieldValue::text(" 42 ").as_number(), Some(42.0));
        assert_eq!(FieldValue::text("abc").as_number(), None);
        assert_eq!(FieldValue::Number(f64::NAN).as_number(), None);
        assert_eq!(FieldValue::Boolean(true).as_number(), None);
        assert_eq!(FieldValue::Empty.as_number(), None);
    }

    #[test]
    fn test_group_labels() {
        assert_eq!(FieldValue::Empty.group_label(), EMPTY_LABEL);
        assert_eq!(FieldValue::text("  ").group_label(), EMPTY_LABEL);
        assert_eq!(FieldValue::Number(7.0).group_label(), "7");
        assert_eq!(FieldValue::Number(2.5).group_label(), "2.5");
        assert_eq!(FieldValue::text("North").group_label(), "North");
    }

    #[test]
    fn test_record_missing_field_reads_empty() {
        let record = Record::from_pairs([("amt", 10.0)]);
        assert_eq!(record.get("amt"), &FieldValue::Number(10.0));
        assert_eq!(record.get("missing"), &FieldValue::Empty);
    }

    #[test]
    fn test_record_json_shape() {
        let record: Record =
            serde_json::from_str(r#"{"date":"2024-01-05","amt":10,"ok":true,"note":null}"#).unwrap();
        assert_eq!(record.get("date"), &FieldValue::text("2024-01-05"));
        assert_eq!(record.get("amt"), &FieldValue::Number(10.0));
        assert_eq!(record.get("ok"), &FieldValue::Boolean(true));
        assert_eq!(record.get("note"), &FieldValue::Empty);
    }
}
