//! FILENAME: catalogue/src/statistic.rs
//! PURPOSE: The persisted statistic: definition plus last materialized result.
//! CONTEXT: Statistics are stored as camelCase JSON. A statistic reads either
//! a raw form's records or another statistic's stored rows; `dependents` is
//! the reverse of that link and is maintained by the catalogue.

use std::collections::BTreeSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use engine::{
    ColumnDescriptor, ConfigError, DataRange, DependencyNode, ResultRow, RowFilter, StatisticId,
    StatisticResult,
};
use horizontal_engine::HorizontalConfig;
use vertical_engine::VerticalConfig;

/// Whether the external store may evict the statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    #[default]
    Permanent,
    Temporary,
}

/// Where a statistic reads its records from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Source {
    /// Raw records of an external form.
    #[serde(rename_all = "camelCase")]
    RawForm {
        form_id: String,
        #[serde(default)]
        form_name: String,
    },
    /// The stored result rows of another statistic.
    #[serde(rename_all = "camelCase")]
    Statistic {
        statistic_id: StatisticId,
        #[serde(default)]
        statistic_name: String,
    },
}

impl Source {
    pub fn raw_form(form_id: impl Into<String>) -> Self {
        Source::RawForm { form_id: form_id.into(), form_name: String::new() }
    }

    pub fn statistic(statistic_id: StatisticId) -> Self {
        Source::Statistic { statistic_id, statistic_name: String::new() }
    }

    /// The upstream statistic, when reading from one.
    pub fn statistic_id(&self) -> Option<StatisticId> {
        match self {
            Source::Statistic { statistic_id, .. } => Some(*statistic_id),
            Source::RawForm { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Orientation-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "orientation", rename_all = "snake_case")]
pub enum StatisticConfig {
    Vertical(VerticalConfig),
    Horizontal(HorizontalConfig),
}

impl StatisticConfig {
    pub fn orientation(&self) -> Orientation {
        match self {
            StatisticConfig::Vertical(_) => Orientation::Vertical,
            StatisticConfig::Horizontal(_) => Orientation::Horizontal,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StatisticConfig::Vertical(config) => config.validate(),
            StatisticConfig::Horizontal(config) => config.validate(),
        }
    }
}

impl From<VerticalConfig> for StatisticConfig {
    fn from(config: VerticalConfig) -> Self {
        StatisticConfig::Vertical(config)
    }
}

impl From<HorizontalConfig> for StatisticConfig {
    fn from(config: HorizontalConfig) -> Self {
        StatisticConfig::Horizontal(config)
    }
}

// ============================================================================
// STATISTIC
// ============================================================================

/// A named statistic and its last materialized result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistic {
    pub id: StatisticId,
    pub name: String,
    #[serde(default)]
    pub storage_type: StorageType,
    pub source: Source,
    pub config: StatisticConfig,
    /// Row predicates applied before grouping, AND-combined.
    #[serde(default)]
    pub filters: Vec<RowFilter>,

    /// Result rows of the last materialization.
    #[serde(default)]
    pub data: Vec<ResultRow>,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub data_range: DataRange,

    /// Statistics sourced directly from this one.
    #[serde(default)]
    pub dependents: BTreeSet<StatisticId>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Statistic {
    pub fn orientation(&self) -> Orientation {
        self.config.orientation()
    }

    /// Whether the statistic has been materialized at least once.
    pub fn is_materialized(&self) -> bool {
        self.last_updated.is_some()
    }

    /// Replaces the stored result wholesale.
    pub(crate) fn replace_result(&mut self, result: StatisticResult, at: DateTime<Utc>) {
        self.data = result.rows;
        self.columns = result.columns;
        self.data_range = result.data_range;
        self.last_updated = Some(at);
    }
}

impl DependencyNode for Statistic {
    fn id(&self) -> StatisticId {
        self.id
    }

    fn upstream_id(&self) -> Option<StatisticId> {
        self.source.statistic_id()
    }
}

/// Everything needed to create a statistic; the catalogue assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStatistic {
    pub name: String,
    #[serde(default)]
    pub storage_type: StorageType,
    pub source: Source,
    pub config: StatisticConfig,
    #[serde(default)]
    pub filters: Vec<RowFilter>,
}

impl NewStatistic {
    pub fn new(name: impl Into<String>, source: Source, config: impl Into<StatisticConfig>) -> Self {
        NewStatistic {
            name: name.into(),
            storage_type: StorageType::default(),
            source,
            config: config.into(),
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filters.push(filter);
        self
    }
}
