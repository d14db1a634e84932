//! FILENAME: vertical-engine/src/definition.rs
//! Vertical Statistic Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE a time-series
//! statistic. They arrive as camelCase JSON from the statistic store and are
//! validated before any aggregation work begins.

use serde::{Deserialize, Serialize};
use engine::{AggregationKind, CompareType, ConfigError, FieldId, FieldRef, Granularity};

// ============================================================================
// VALUE TYPES
// ============================================================================

/// Which derived series to emit per statistic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// The bucket's own aggregate.
    Absolute,
    /// Running sum across buckets in chronological order.
    Cumulative,
    /// Ratio and delta against the previous bucket.
    PeriodOverPeriod,
}

fn default_value_types() -> Vec<ValueType> {
    vec![ValueType::Absolute]
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete configuration of a vertical (time-series) statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalConfig {
    /// Field holding each record's timestamp.
    pub time_field: FieldId,

    pub granularity: Granularity,

    /// Fields to aggregate per bucket, in column order.
    pub statistic_fields: Vec<FieldRef>,

    #[serde(default)]
    pub aggregation: AggregationKind,

    #[serde(default = "default_value_types")]
    pub value_types: Vec<ValueType>,

    /// Named comparisons, each emitting a ratio and a delta column.
    #[serde(default)]
    pub compare_types: Vec<CompareType>,
}

impl VerticalConfig {
    pub fn new(time_field: impl Into<FieldId>, granularity: Granularity) -> Self {
        VerticalConfig {
            time_field: time_field.into(),
            granularity,
            statistic_fields: Vec::new(),
            aggregation: AggregationKind::default(),
            value_types: default_value_types(),
            compare_types: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldRef) -> Self {
        self.statistic_fields.push(field);
        self
    }

    pub fn wants(&self, value_type: ValueType) -> bool {
        self.value_types.contains(&value_type)
    }

    /// Rejects configurations that cannot be run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_field.trim().is_empty() {
            return Err(ConfigError::Missing("timeField"));
        }
        if self.statistic_fields.is_empty() {
            return Err(ConfigError::Missing("statisticFields"));
        }
        for (i, field) in self.statistic_fields.iter().enumerate() {
            if field.field_id.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    setting: "statisticFields",
                    message: format!("entry {} has no field id", i),
                });
            }
            if self.statistic_fields[..i].iter().any(|f| f.field_id == field.field_id) {
                return Err(ConfigError::DuplicateField(field.field_id.clone()));
            }
        }
        if self.value_types.is_empty() {
            return Err(ConfigError::Missing("valueTypes"));
        }
        for (i, compare) in self.compare_types.iter().enumerate() {
            if self.compare_types[..i].contains(compare) {
                return Err(ConfigError::Invalid {
                    setting: "compareTypes",
                    message: format!("'{}' is listed more than once", compare.name()),
                });
            }
            if !compare.supports(self.granularity) {
                return Err(ConfigError::UnsupportedComparison {
                    compare: compare.name().to_string(),
                    granularity: self.granularity.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// COLUMN IDS
// ============================================================================

/// Period key column.
pub const PERIOD_COLUMN: &str = "period";
/// Display label column.
pub const LABEL_COLUMN: &str = "label";

pub fn cumulative_column(field: &str) -> String {
    format!("{}:cumulative", field)
}

pub fn pop_ratio_column(field: &str) -> String {
    format!("{}:pop_ratio", field)
}

pub fn pop_delta_column(field: &str) -> String {
    format!("{}:pop_delta", field)
}

pub fn compare_ratio_column(field: &str, compare: CompareType) -> String {
    format!("{}:{}_ratio", field, compare.name())
}

pub fn compare_delta_column(field: &str, compare: CompareType) -> String {
    format!("{}:{}_delta", field, compare.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VerticalConfig {
        VerticalConfig::new("date", Granularity::Month).with_field(FieldRef::new("amt", "Amount"))
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(config().validate(), Ok(()));
    }

    #[test]
    fn test_missing_time_field() {
        let mut cfg = config();
        cfg.time_field = " ".to_string();
        assert_eq!(cfg.validate(), Err(ConfigError::Missing("timeField")));
    }

    #[test]
    fn test_duplicate_statistic_field() {
        let cfg = config().with_field(FieldRef::new("amt", "Again"));
        assert_eq!(cfg.validate(), Err(ConfigError::DuplicateField("amt".to_string())));
    }

    #[test]
    fn test_comparison_finer_than_granularity() {
        let mut cfg = config();
        cfg.granularity = Granularity::Year;
        cfg.compare_types.push(CompareType::PreviousMonth);
        assert!(matches!(cfg.validate(), Err(ConfigError::UnsupportedComparison { .. })));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let cfg: VerticalConfig = serde_json::from_str(
            r#"{
                "timeField": "date",
                "granularity": "quarter",
                "statisticFields": [{"fieldId": "amt", "label": "Amount"}],
                "compareTypes": ["year_over_year"]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.granularity, Granularity::Quarter);
        assert_eq!(cfg.aggregation, AggregationKind::Sum);
        assert_eq!(cfg.value_types, vec![ValueType::Absolute]);
        assert_eq!(cfg.compare_types, vec![CompareType::PreviousYear]);
    }

    #[test]
    fn test_unknown_granularity_is_rejected() {
        let parsed: Result<VerticalConfig, _> = serde_json::from_str(
            r#"{"timeField": "date", "granularity": "fortnight", "statisticFields": []}"#,
        );
        assert!(parsed.unwrap_err().to_string().contains("unknown granularity"));
    }
}
