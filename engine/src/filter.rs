//! FILENAME: engine/src/filter.rs
//! PURPOSE: Row predicates applied to source records before grouping.
//! CONTEXT: A statistic carries an ordered list of filters; a record is kept
//! only when every filter accepts it.

use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use crate::value::{FieldId, FieldValue, Record};

/// Operators for single-value comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    IsEmpty,
    IsNotEmpty,
}

/// A row predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowFilter {
    /// Keep records whose field matches one of the listed values exactly.
    InSet { field: FieldId, values: Vec<FieldValue> },
    /// Keep records whose field satisfies `operator` against `value`.
    Compare {
        field: FieldId,
        operator: FilterOperator,
        #[serde(default)]
        value: FieldValue,
    },
}

impl RowFilter {
    pub fn field(&self) -> &str {
        match self {
            RowFilter::InSet { field, .. } | RowFilter::Compare { field, .. } => field,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            RowFilter::InSet { field, values } => {
                let actual = record.get(field);
                values.iter().any(|candidate| values_equal(actual, candidate))
            }
            RowFilter::Compare { field, operator, value } => {
                compare(record.get(field), *operator, value)
            }
        }
    }
}

/// Applies every filter (logical AND), keeping record order.
pub fn apply_filters<'a>(records: &'a [Record], filters: &[RowFilter]) -> Vec<&'a Record> {
    let kept: Vec<&Record> = records
        .iter()
        .filter(|record| filters.iter().all(|f| f.matches(record)))
        .collect();
    if !filters.is_empty() {
        log::debug!("filters kept {}/{} records", kept.len(), records.len());
    }
    kept
}

fn values_equal(a: &FieldValue, b: &FieldValue) -> bool {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x == y,
        _ => a.is_empty() == b.is_empty() && a.group_label() == b.group_label(),
    }
}

fn ordering(a: &FieldValue, b: &FieldValue) -> Option<Ordering> {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ if a.is_empty() || b.is_empty() => None,
        _ => Some(a.group_label().cmp(&b.group_label())),
    }
}

fn compare(actual: &FieldValue, operator: FilterOperator, expected: &FieldValue) -> bool {
    match operator {
        FilterOperator::Eq => values_equal(actual, expected),
        FilterOperator::Ne => !values_equal(actual, expected),
        FilterOperator::Gt => ordering(actual, expected) == Some(Ordering::Greater),
        FilterOperator::Gte => matches!(ordering(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
        FilterOperator::Lt => ordering(actual, expected) == Some(Ordering::Less),
        FilterOperator::Lte => matches!(ordering(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        FilterOperator::Contains => {
            !actual.is_empty() && actual.group_label().contains(&expected.group_label())
        }
        FilterOperator::NotContains => {
            actual.is_empty() || !actual.group_label().contains(&expected.group_label())
        }
        FilterOperator::IsEmpty => actual.is_empty(),
        FilterOperator::IsNotEmpty => !actual.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::from_pairs([("region", FieldValue::text("North")), ("amt", FieldValue::Number(10.0))]),
            Record::from_pairs([("region", FieldValue::text("South")), ("amt", FieldValue::text("25"))]),
            Record::from_pairs([("region", FieldValue::text("Northwest")), ("amt", FieldValue::Empty)]),
        ]
    }

    #[test]
    fn test_in_set_exact_match() {
        let rows = records();
        let filter = RowFilter::InSet {
            field: "region".into(),
            values: vec![FieldValue::text("North"), FieldValue::text("South")],
        };
        assert_eq!(apply_filters(&rows, &[filter]).len(), 2);
    }

    #[test]
    fn test_numeric_comparison_coerces_text() {
        let rows = records();
        let filter = RowFilter::Compare {
            field: "amt".into(),
            operator: FilterOperator::Gt,
            value: FieldValue::Number(12.0),
        };
        let kept = apply_filters(&rows, &[filter]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("region"), &FieldValue::text("South"));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let rows = records();
        let filters = [
            RowFilter::Compare {
                field: "region".into(),
                operator: FilterOperator::Contains,
                value: FieldValue::text("North"),
            },
            RowFilter::Compare {
                field: "amt".into(),
                operator: FilterOperator::IsNotEmpty,
                value: FieldValue::Empty,
            },
        ];
        let kept = apply_filters(&rows, &filters);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("region"), &FieldValue::text("North"));
    }

    #[test]
    fn test_filter_json_shape() {
        let filter: RowFilter = serde_json::from_str(
            r#"{"type":"compare","field":"amt","operator":"lte","value":10}"#,
        )
        .unwrap();
        assert!(filter.matches(&records()[0]));
        assert!(!filter.matches(&records()[1]));
    }
}
