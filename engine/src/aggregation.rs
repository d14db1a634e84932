//! FILENAME: engine/src/aggregation.rs
//! PURPOSE: Numeric reducers shared by the vertical and horizontal engines.
//! CONTEXT: `aggregate` is the pure primitive over an already-cleaned list of
//! numbers. `Accumulator` collects one group's raw values, keeping the raw
//! record count apart from the numeric list so that `count` reports the
//! unfiltered group size while every other kind sees only numbers.

use std::str::FromStr;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use crate::error::ConfigError;
use crate::value::FieldValue;

// ============================================================================
// AGGREGATION KINDS
// ============================================================================

/// Supported aggregation functions for statistic fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AggregationKind {
    Count,
    #[default]
    Sum,
    Avg,
    Max,
    Min,
    Median,
}

/// Registration table: one entry per kind, plus accepted aliases.
const AGGREGATIONS: &[(&str, AggregationKind)] = &[
    ("count", AggregationKind::Count),
    ("sum", AggregationKind::Sum),
    ("avg", AggregationKind::Avg),
    ("average", AggregationKind::Avg),
    ("max", AggregationKind::Max),
    ("min", AggregationKind::Min),
    ("median", AggregationKind::Median),
];

impl AggregationKind {
    pub fn name(self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::Sum => "sum",
            AggregationKind::Avg => "avg",
            AggregationKind::Max => "max",
            AggregationKind::Min => "min",
            AggregationKind::Median => "median",
        }
    }
}

impl FromStr for AggregationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        AGGREGATIONS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| ConfigError::Unknown { kind: "aggregation", value: s.to_string() })
    }
}

impl TryFrom<String> for AggregationKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AggregationKind> for String {
    fn from(value: AggregationKind) -> Self {
        value.name().to_string()
    }
}

impl std::fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// PRIMITIVE
// ============================================================================

/// Reduces a cleaned list of numbers.
///
/// Returns `None` only for `max`, `min` and `median` over an empty list.
/// `count` returns the slice length; callers that need the unfiltered group
/// size go through [`Accumulator`].
pub fn aggregate(values: &[f64], kind: AggregationKind) -> Option<f64> {
    match kind {
        AggregationKind::Count => Some(values.len() as f64),
        AggregationKind::Sum => Some(values.iter().sum()),
        AggregationKind::Avg => {
            if values.is_empty() {
                Some(0.0)
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        AggregationKind::Max => values.iter().copied().reduce(f64::max),
        AggregationKind::Min => values.iter().copied().reduce(f64::min),
        AggregationKind::Median => median(values),
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sums the present values; absent values contribute nothing.
pub fn sum_present<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().sum()
}

/// Mean of the present values, or `None` when none are present.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: SmallVec<[f64; 16]> = values.into_iter().flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Collects the values of one statistic field within one group.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    /// Every record routed to this group, numeric or not.
    pub count: usize,
    /// Non-empty values that failed numeric coercion.
    pub non_numeric: usize,
    numbers: Vec<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator::default()
    }

    /// Routes one record's field value into the group.
    pub fn add(&mut self, value: &FieldValue) {
        self.count += 1;
        match value.as_number() {
            Some(n) => self.numbers.push(n),
            None if !value.is_empty() => self.non_numeric += 1,
            None => {}
        }
    }

    pub fn numbers(&self) -> &[f64] {
        &self.numbers
    }

    /// Computes the final aggregate value.
    pub fn compute(&self, kind: AggregationKind) -> Option<f64> {
        match kind {
            AggregationKind::Count => Some(self.count as f64),
            _ => aggregate(&self.numbers, kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XS: [f64; 5] = [4.0, 1.0, 9.0, 3.0, 8.0];

    #[test]
    fn test_sum_and_avg() {
        assert_eq!(aggregate(&XS, AggregationKind::Sum), Some(25.0));
        assert_eq!(aggregate(&XS, AggregationKind::Avg), Some(5.0));
        assert_eq!(aggregate(&XS, AggregationKind::Count), Some(5.0));
    }

    #[test]
    fn test_median_between_extremes() {
        let median = aggregate(&XS, AggregationKind::Median).unwrap();
        let min = aggregate(&XS, AggregationKind::Min).unwrap();
        let max = aggregate(&XS, AggregationKind::Max).unwrap();
        assert_eq!(median, 4.0);
        assert!(min <= median && median <= max);
        assert_eq!(aggregate(&[1.0, 2.0, 3.0, 10.0], AggregationKind::Median), Some(2.5));
    }

    #[test]
    fn test_empty_input_rules() {
        assert_eq!(aggregate(&[], AggregationKind::Count), Some(0.0));
        assert_eq!(aggregate(&[], AggregationKind::Sum), Some(0.0));
        assert_eq!(aggregate(&[], AggregationKind::Avg), Some(0.0));
        assert_eq!(aggregate(&[], AggregationKind::Max), None);
        assert_eq!(aggregate(&[], AggregationKind::Min), None);
        assert_eq!(aggregate(&[], AggregationKind::Median), None);
    }

    #[test]
    fn test_count_uses_unfiltered_group_size() {
        let mut acc = Accumulator::new();
        acc.add(&FieldValue::Number(2.0));
        acc.add(&FieldValue::text("n/a"));
        acc.add(&FieldValue::Empty);
        acc.add(&FieldValue::text("6"));

        assert_eq!(acc.compute(AggregationKind::Count), Some(4.0));
        assert_eq!(acc.compute(AggregationKind::Sum), Some(8.0));
        assert_eq!(acc.compute(AggregationKind::Avg), Some(4.0));
        assert_eq!(acc.non_numeric, 1);
    }

    #[test]
    fn test_kind_lookup() {
        assert_eq!("SUM".parse::<AggregationKind>(), Ok(AggregationKind::Sum));
        assert_eq!("average".parse::<AggregationKind>(), Ok(AggregationKind::Avg));
        assert!(matches!(
            "mode".parse::<AggregationKind>(),
            Err(ConfigError::Unknown { kind: "aggregation", .. })
        ));
        let kind: AggregationKind = serde_json::from_str("\"median\"").unwrap();
        assert_eq!(kind, AggregationKind::Median);
    }

    #[test]
    fn test_present_helpers() {
        assert_eq!(sum_present([Some(1.0), None, Some(2.5)]), 3.5);
        assert_eq!(mean_present([Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean_present([None, None]), None);
    }
}
