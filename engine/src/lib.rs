//! FILENAME: engine/src/lib.rs
//! PURPOSE: Shared primitives for derived statistics.
//! CONTEXT: The vertical (time-series) and horizontal (grouping/pivot)
//! engines both build on the types here; the catalogue service uses the
//! dependency graph to order cascades.
//!
//! Layers:
//! - `value`: record and result cell values
//! - `aggregation`: numeric reducers (count/sum/avg/max/min/median)
//! - `time_bucket`: period keys, labels, previous/comparison periods
//! - `filter`: row predicates applied before grouping
//! - `result`: result rows, columns and run envelope
//! - `dependency_graph`: upstream/dependents tracking and cascade order

pub mod aggregation;
pub mod dependency_graph;
pub mod error;
pub mod filter;
pub mod result;
pub mod time_bucket;
pub mod value;

// Re-export commonly used types at the crate root
pub use aggregation::{aggregate, mean_present, sum_present, Accumulator, AggregationKind};
pub use dependency_graph::{CycleError, DependencyGraph, DependencyNode, StatisticId};
pub use error::{ConfigError, DataQualityWarning, WarningKind};
pub use filter::{apply_filters, FilterOperator, RowFilter};
pub use result::{
    ColumnDescriptor, ColumnRole, DataRange, FieldRef, ResultRow, RowKind, RunOptions, RunOutput,
    StatisticResult, RECORD_COUNT_COLUMN,
};
pub use time_bucket::{bucket_key, parse_timestamp, CompareType, Granularity, PeriodKey};
pub use value::{format_number, CellValue, FieldId, FieldValue, Record, EMPTY_LABEL};

/// Ratio of `current` against a base value.
///
/// `(current - base) / |base|`; when the base is exactly zero the result is
/// the sign of `current` (`±1`), or `None` when both are zero.
pub fn change_ratio(current: f64, base: f64) -> Option<f64> {
    if base == 0.0 {
        if current == 0.0 {
            None
        } else {
            Some(current.signum())
        }
    } else {
        Some((current - base) / base.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_ratio() {
        assert!((change_ratio(7.0, 15.0).unwrap() + 0.4667).abs() < 1e-3);
        assert_eq!(change_ratio(5.0, -10.0), Some(1.5));
        assert_eq!(change_ratio(3.0, 0.0), Some(1.0));
        assert_eq!(change_ratio(-3.0, 0.0), Some(-1.0));
        assert_eq!(change_ratio(0.0, 0.0), None);
    }
}
