//! FILENAME: horizontal-engine/src/definition.rs
//! Horizontal Statistic Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a grouping
//! statistic. These structures are designed to be:
//! - Serializable (stored as camelCase JSON next to the statistic)
//! - Validated once, before any grouping work begins
//! - Immutable snapshots of user intent

use std::str::FromStr;
use serde::{Deserialize, Serialize};
use engine::{AggregationKind, ConfigError, FieldId, FieldRef};

// ============================================================================
// PURPOSE
// ============================================================================

/// What the statistic is for; ratio analysis adds share columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Purpose {
    Plain,
    RatioAnalysis,
}

impl Default for Purpose {
    fn default() -> Self {
        Purpose::Plain
    }
}

const PURPOSES: &[(&str, Purpose)] = &[
    ("plain", Purpose::Plain),
    ("ratio_analysis", Purpose::RatioAnalysis),
    ("ratioanalysis", Purpose::RatioAnalysis),
    ("ratio", Purpose::RatioAnalysis),
];

impl Purpose {
    pub fn name(self) -> &'static str {
        match self {
            Purpose::Plain => "plain",
            Purpose::RatioAnalysis => "ratio_analysis",
        }
    }
}

impl FromStr for Purpose {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(PURPOSES, s, "purpose")
    }
}

impl TryFrom<String> for Purpose {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Purpose> for String {
    fn from(value: Purpose) -> Self {
        value.name().to_string()
    }
}

// ============================================================================
// SORT ORDER
// ============================================================================

/// Sort order for groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Descending
    }
}

const SORT_ORDERS: &[(&str, SortOrder)] = &[
    ("asc", SortOrder::Ascending),
    ("ascending", SortOrder::Ascending),
    ("desc", SortOrder::Descending),
    ("descending", SortOrder::Descending),
];

impl SortOrder {
    pub fn name(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(SORT_ORDERS, s, "sort order")
    }
}

impl TryFrom<String> for SortOrder {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SortOrder> for String {
    fn from(value: SortOrder) -> Self {
        value.name().to_string()
    }
}

fn lookup<T: Copy>(table: &[(&str, T)], s: &str, kind: &'static str) -> Result<T, ConfigError> {
    let key = s.trim().to_ascii_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
        .ok_or_else(|| ConfigError::Unknown { kind, value: s.to_string() })
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete configuration of a horizontal (grouping) statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalConfig {
    /// Fields whose value tuple identifies a group, outermost first.
    pub group_fields: Vec<FieldRef>,

    /// Fields aggregated per group.
    pub statistic_fields: Vec<FieldRef>,

    #[serde(default)]
    pub aggregation: AggregationKind,

    #[serde(default)]
    pub purpose: Purpose,

    /// Statistic field to sort by (defaults to the first statistic field).
    #[serde(default)]
    pub sort_by: Option<FieldId>,

    #[serde(default)]
    pub sort_order: SortOrder,

    /// Keep only the first N groups and fold the rest into "Others".
    #[serde(default)]
    pub top_n: Option<usize>,

    /// Insert subtotal rows per first-level group value.
    #[serde(default)]
    pub show_subtotal: bool,

    /// Group field whose distinct values become columns.
    #[serde(default)]
    pub pivot_field: Option<FieldId>,
}

impl HorizontalConfig {
    pub fn new() -> Self {
        HorizontalConfig {
            group_fields: Vec::new(),
            statistic_fields: Vec::new(),
            aggregation: AggregationKind::default(),
            purpose: Purpose::default(),
            sort_by: None,
            sort_order: SortOrder::default(),
            top_n: None,
            show_subtotal: false,
            pivot_field: None,
        }
    }

    pub fn with_group(mut self, field: FieldRef) -> Self {
        self.group_fields.push(field);
        self
    }

    pub fn with_field(mut self, field: FieldRef) -> Self {
        self.statistic_fields.push(field);
        self
    }

    pub fn is_ratio_analysis(&self) -> bool {
        self.purpose == Purpose::RatioAnalysis
    }

    /// Index of the statistic field that drives sorting.
    pub fn sort_index(&self) -> usize {
        self.sort_by
            .as_ref()
            .and_then(|id| self.statistic_fields.iter().position(|f| &f.field_id == id))
            .unwrap_or(0)
    }

    /// Group fields other than the pivot field.
    pub fn row_fields(&self) -> Vec<&FieldRef> {
        self.group_fields
            .iter()
            .filter(|f| Some(&f.field_id) != self.pivot_field.as_ref())
            .collect()
    }

    /// Rejects configurations that cannot be run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_fields.is_empty() {
            return Err(ConfigError::Missing("groupFields"));
        }
        if self.statistic_fields.is_empty() {
            return Err(ConfigError::Missing("statisticFields"));
        }

        let all = self.group_fields.iter().map(|f| ("groupFields", f))
            .chain(self.statistic_fields.iter().map(|f| ("statisticFields", f)));
        let mut seen: Vec<&str> = Vec::new();
        for (setting, field) in all {
            if field.field_id.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    setting,
                    message: "entry has no field id".to_string(),
                });
            }
            if seen.contains(&field.field_id.as_str()) {
                return Err(ConfigError::DuplicateField(field.field_id.clone()));
            }
            seen.push(&field.field_id);
        }

        if let Some(sort_by) = &self.sort_by {
            if !self.statistic_fields.iter().any(|f| &f.field_id == sort_by) {
                return Err(ConfigError::UndefinedField { setting: "sortBy", field: sort_by.clone() });
            }
        }
        if self.top_n == Some(0) {
            return Err(ConfigError::Invalid {
                setting: "topN",
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(pivot) = &self.pivot_field {
            if !self.group_fields.iter().any(|f| &f.field_id == pivot) {
                return Err(ConfigError::UndefinedField { setting: "pivotField", field: pivot.clone() });
            }
        }
        Ok(())
    }
}

impl Default for HorizontalConfig {
    fn default() -> Self {
        HorizontalConfig::new()
    }
}

// ============================================================================
// COLUMN IDS AND LABELS
// ============================================================================

/// Label of the row folding every group beyond Top-N.
pub const OTHERS_LABEL: &str = "Others";
pub const SUBTOTAL_LABEL: &str = "Subtotal";
pub const TOTAL_LABEL: &str = "Total";
/// Row label used by a pivot with no row fields.
pub const ALL_LABEL: &str = "(all)";
/// Row dimension column used by a pivot with no row fields.
pub const GROUP_COLUMN: &str = "group";

pub fn ratio_column(field: &str) -> String {
    format!("{}:ratio", field)
}

pub fn cumulative_ratio_column(field: &str) -> String {
    format!("{}:cumulative_ratio", field)
}

/// Pivot cell column for one statistic field and pivot value.
///
/// `%` and `:` in the value are percent-escaped, so a cell id never carries a
/// `:` suffix of its own and cannot meet a ratio or row-total column.
pub fn pivot_column(field: &str, value: &str) -> String {
    let mut id = String::with_capacity(field.len() + value.len() + 1);
    id.push_str(field);
    id.push('@');
    for ch in value.chars() {
        match ch {
            '%' => id.push_str("%25"),
            ':' => id.push_str("%3A"),
            _ => id.push(ch),
        }
    }
    id
}

/// Pivot row-total column for one statistic field.
pub fn pivot_total_column(field: &str) -> String {
    format!("{}:total", field)
}
