//! FILENAME: horizontal-engine/src/pivot.rs
//! Pivot Engine - Cross-tab layout of a horizontal statistic.
//!
//! The pivot field's distinct values become columns; the remaining group
//! fields form the rows. Every (row group, pivot value, statistic field)
//! cell aggregates the matching records, so an empty intersection reports
//! the empty-input aggregate (`count` and `sum` give 0, `max` gives null).
//!
//! Column layout per statistic field `f`:
//!   f@<value> [f@<value>:ratio] ... f:total [f:total:ratio]
//! followed by a single `record_count` column.

use std::cmp::Ordering;
use rustc_hash::FxHashMap;
use engine::{
    sum_present, Accumulator, CellValue, ColumnDescriptor, ColumnRole, ConfigError, DataRange,
    FieldRef, Record, ResultRow, RowKind, RunOutput, StatisticResult, EMPTY_LABEL,
    RECORD_COUNT_COLUMN,
};
use crate::cache::{GroupCache, GroupKey};
use crate::definition::{
    pivot_column, pivot_total_column, ratio_column, HorizontalConfig, ALL_LABEL, GROUP_COLUMN,
    OTHERS_LABEL, TOTAL_LABEL,
};
use crate::engine::{compare_sort_values, marker_labels};

// ============================================================================
// PIVOT ROWS
// ============================================================================

/// One row of the cross-tab before rendering.
#[derive(Debug, Clone)]
struct PivotRow {
    kind: RowKind,
    labels: Vec<CellValue>,
    /// cells[field][pivot value]
    cells: Vec<Vec<Option<f64>>>,
    record_count: usize,
}

impl PivotRow {
    /// Row total of one statistic field: the sum across pivot columns.
    fn total(&self, field: usize) -> f64 {
        sum_present(self.cells[field].iter().copied())
    }
}

/// Sort tier of a pivot value: numbers, then text, then the empty label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LabelTier {
    Number,
    Text,
    Empty,
}

fn label_tier(label: &str) -> (LabelTier, Option<f64>) {
    if label == EMPTY_LABEL {
        return (LabelTier::Empty, None);
    }
    match label.parse::<f64>() {
        Ok(n) => (LabelTier::Number, Some(n)),
        Err(_) => (LabelTier::Text, None),
    }
}

/// Orders pivot values: numeric labels first by value, then text labels
/// lexically, then the empty label. Ties fall back to the raw text.
fn compare_pivot_labels(a: &str, b: &str) -> Ordering {
    let (tier_a, num_a) = label_tier(a);
    let (tier_b, num_b) = label_tier(b);
    tier_a
        .cmp(&tier_b)
        .then_with(|| match (num_a, num_b) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        })
        .then_with(|| a.cmp(b))
}

// ============================================================================
// PIVOT CALCULATOR
// ============================================================================

/// The calculation engine for cross-tab statistics.
pub struct PivotCalculator<'a> {
    config: &'a HorizontalConfig,
    row_fields: Vec<&'a FieldRef>,
    pivot_field: &'a FieldRef,
}

impl<'a> PivotCalculator<'a> {
    /// Creates a calculator after validating the configuration.
    pub fn new(config: &'a HorizontalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pivot_id = config.pivot_field.as_ref().ok_or(ConfigError::Missing("pivotField"))?;
        let pivot_field = config
            .group_fields
            .iter()
            .find(|f| &f.field_id == pivot_id)
            .ok_or_else(|| ConfigError::UndefinedField { setting: "pivotField", field: pivot_id.clone() })?;
        Ok(PivotCalculator {
            config,
            row_fields: config.row_fields(),
            pivot_field,
        })
    }

    /// Executes the full calculation.
    pub fn calculate<'r, I>(self, records: I) -> RunOutput
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let config = self.config;
        let field_count = config.statistic_fields.len();

        // Group by (row fields..., pivot field); the pivot label is the last key part.
        let mut key_fields = self.row_fields.clone();
        key_fields.push(self.pivot_field);
        let cache = GroupCache::build(records, &key_fields, &config.statistic_fields);
        let warnings = cache.warnings(&config.statistic_fields);

        // Distinct pivot values, sorted.
        let mut pivot_values: Vec<String> = Vec::new();
        for group in &cache.groups {
            if let Some(label) = group.key.last() {
                if !pivot_values.contains(label) {
                    pivot_values.push(label.clone());
                }
            }
        }
        pivot_values.sort_by(|a, b| compare_pivot_labels(a, b));

        let columns = self.columns(&pivot_values);
        if cache.is_empty() {
            log::debug!("pivot run produced no groups");
            return RunOutput {
                result: StatisticResult { columns, rows: Vec::new(), data_range: DataRange::default() },
                warnings,
            };
        }

        let rows = self.build_rows(&cache, &pivot_values);
        let row_group_count = rows.len();

        // Sort row groups by the sort field's row total.
        let sort_idx = config.sort_index();
        let mut rows = rows;
        rows.sort_by(|a, b| compare_sort_values(Some(a.total(sort_idx)), Some(b.total(sort_idx)), config.sort_order));

        // Top-N
        if let Some(n) = config.top_n {
            if n < rows.len() {
                let folded = rows.split_off(n);
                log::debug!("folded {} row group(s) into '{}'", folded.len(), OTHERS_LABEL);
                let mut others = sum_rows(&folded, field_count, pivot_values.len());
                others.kind = RowKind::Others;
                others.labels = marker_labels(OTHERS_LABEL, self.dimension_count());
                rows.push(others);
            }
        }

        // Grand total row across every emitted row, Others included.
        let mut total = sum_rows(&rows, field_count, pivot_values.len());
        total.kind = RowKind::Total;
        total.labels = marker_labels(TOTAL_LABEL, self.dimension_count());
        let grand_totals: Vec<f64> = (0..field_count).map(|f| total.total(f)).collect();
        rows.push(total);

        log::debug!(
            "pivot run: {} row group(s) x {} pivot value(s) from {} record(s)",
            row_group_count,
            pivot_values.len(),
            cache.record_count
        );

        let rendered = rows
            .iter()
            .map(|row| self.render(row, &pivot_values, &grand_totals))
            .collect();

        RunOutput {
            result: StatisticResult {
                columns,
                rows: rendered,
                data_range: DataRange {
                    record_count: cache.record_count,
                    group_count: row_group_count,
                    ..DataRange::default()
                },
            },
            warnings,
        }
    }

    /// Number of row dimension columns.
    fn dimension_count(&self) -> usize {
        self.row_fields.len().max(1)
    }

    /// Folds the collected groups into one row per row group, in first-appearance order.
    fn build_rows(&self, cache: &GroupCache, pivot_values: &[String]) -> Vec<PivotRow> {
        let field_count = self.config.statistic_fields.len();
        let empty_cell = Accumulator::new().compute(self.config.aggregation);

        let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();
        let mut rows: Vec<PivotRow> = Vec::new();

        for group in &cache.groups {
            let (pivot_label, row_key) = match group.key.split_last() {
                Some((last, rest)) => (last, GroupKey::from(rest)),
                None => continue,
            };
            let Some(col) = pivot_values.iter().position(|v| v == pivot_label) else {
                continue;
            };

            let idx = match index.get(&row_key) {
                Some(&idx) => idx,
                None => {
                    let labels = if row_key.is_empty() {
                        vec![CellValue::text(ALL_LABEL)]
                    } else {
                        row_key.iter().map(|label| CellValue::text(label.as_str())).collect()
                    };
                    rows.push(PivotRow {
                        kind: RowKind::Normal,
                        labels,
                        cells: vec![vec![empty_cell; pivot_values.len()]; field_count],
                        record_count: 0,
                    });
                    index.insert(row_key, rows.len() - 1);
                    rows.len() - 1
                }
            };

            let row = &mut rows[idx];
            row.record_count += group.record_count;
            for (field, value) in group.values(self.config.aggregation).into_iter().enumerate() {
                row.cells[field][col] = value;
            }
        }
        rows
    }

    fn dimension_columns(&self) -> Vec<ColumnDescriptor> {
        if self.row_fields.is_empty() {
            vec![ColumnDescriptor::new(GROUP_COLUMN, "Group", ColumnRole::Dimension)]
        } else {
            self.row_fields
                .iter()
                .map(|f| ColumnDescriptor::new(f.field_id.clone(), f.display(), ColumnRole::Dimension))
                .collect()
        }
    }

    fn columns(&self, pivot_values: &[String]) -> Vec<ColumnDescriptor> {
        let ratios = self.config.is_ratio_analysis();
        let mut columns = self.dimension_columns();
        for field in &self.config.statistic_fields {
            for value in pivot_values {
                let id = pivot_column(&field.field_id, value);
                columns.push(ColumnDescriptor::new(
                    id.clone(),
                    format!("{} {}", field.display(), value),
                    ColumnRole::Value,
                ));
                if ratios {
                    columns.push(ColumnDescriptor::new(
                        ratio_column(&id),
                        format!("{} {} share", field.display(), value),
                        ColumnRole::Ratio,
                    ));
                }
            }
            let total_id = pivot_total_column(&field.field_id);
            columns.push(ColumnDescriptor::new(
                total_id.clone(),
                format!("{} total", field.display()),
                ColumnRole::Value,
            ));
            if ratios {
                columns.push(ColumnDescriptor::new(
                    ratio_column(&total_id),
                    format!("{} total share", field.display()),
                    ColumnRole::Ratio,
                ));
            }
        }
        columns.push(ColumnDescriptor::new(RECORD_COUNT_COLUMN, "Records", ColumnRole::RecordCount));
        columns
    }

    fn render(&self, row: &PivotRow, pivot_values: &[String], grand_totals: &[f64]) -> ResultRow {
        let ratios = self.config.is_ratio_analysis();
        let mut out = ResultRow::new(row.kind);

        for (column, label) in self.dimension_columns().iter().zip(&row.labels) {
            out.set(column.id.clone(), label.clone());
        }

        for (f, field) in self.config.statistic_fields.iter().enumerate() {
            let grand = grand_totals[f];
            let share = |value: Option<f64>| if grand == 0.0 { None } else { value.map(|v| v / grand) };

            for (col, value) in pivot_values.iter().enumerate() {
                let id = pivot_column(&field.field_id, value);
                let cell = row.cells[f][col];
                if ratios {
                    out.set(ratio_column(&id), share(cell));
                }
                out.set(id, cell);
            }

            let total_id = pivot_total_column(&field.field_id);
            let total = Some(row.total(f));
            if ratios {
                out.set(ratio_column(&total_id), share(total));
            }
            out.set(total_id, total);
        }

        out.set(RECORD_COUNT_COLUMN, row.record_count as f64);
        out
    }
}

/// Cell-wise sum of `rows` (labels left empty).
fn sum_rows(rows: &[PivotRow], field_count: usize, value_count: usize) -> PivotRow {
    let cells = (0..field_count)
        .map(|f| {
            (0..value_count)
                .map(|col| Some(sum_present(rows.iter().map(|r| r.cells[f][col]))))
                .collect()
        })
        .collect();
    PivotRow {
        kind: RowKind::Normal,
        labels: Vec::new(),
        cells,
        record_count: rows.iter().map(|r| r.record_count).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{AggregationKind, FieldValue};
    use crate::definition::{Purpose, SortOrder};
    use crate::engine::run_horizontal;

    fn sale(region: &str, product: &str, amt: f64) -> Record {
        Record::from_pairs([
            ("region", FieldValue::text(region)),
            ("product", FieldValue::text(product)),
            ("amt", FieldValue::Number(amt)),
        ])
    }

    fn sales() -> Vec<Record> {
        vec![
            sale("North", "Apples", 100.0),
            sale("North", "Oranges", 150.0),
            sale("South", "Apples", 200.0),
            sale("South", "Oranges", 250.0),
            sale("East", "Apples", 30.0),
        ]
    }

    fn pivot_config() -> HorizontalConfig {
        let mut cfg = HorizontalConfig::new()
            .with_group(FieldRef::new("region", "Region"))
            .with_group(FieldRef::new("product", "Product"))
            .with_field(FieldRef::new("amt", "Amount"));
        cfg.pivot_field = Some("product".to_string());
        cfg
    }

    fn row<'a>(output: &'a RunOutput, region: &str) -> &'a ResultRow {
        output
            .result
            .rows
            .iter()
            .find(|r| r.get("region") == &CellValue::text(region))
            .unwrap()
    }

    #[test]
    fn test_basic_pivot_calculation() {
        let output = run_horizontal(&sales(), &pivot_config()).unwrap();
        let ids: Vec<&str> = output.result.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["region", "amt@Apples", "amt@Oranges", "amt:total", "record_count"]);

        let north = row(&output, "North");
        assert_eq!(north.number("amt@Apples"), Some(100.0));
        assert_eq!(north.number("amt@Oranges"), Some(150.0));
        assert_eq!(north.number("amt:total"), Some(250.0));

        // Empty intersection aggregates over nothing.
        let east = row(&output, "East");
        assert_eq!(east.number("amt@Oranges"), Some(0.0));
        assert_eq!(east.number(RECORD_COUNT_COLUMN), Some(1.0));
    }

    #[test]
    fn test_grand_total_consistency() {
        let output = run_horizontal(&sales(), &pivot_config()).unwrap();
        let rows = &output.result.rows;
        let total = rows.last().unwrap();
        assert_eq!(total.kind, RowKind::Total);

        let row_totals: f64 = rows.iter().filter(|r| r.kind.is_detail()).map(|r| r.number("amt:total").unwrap()).sum();
        let column_totals = total.number("amt@Apples").unwrap() + total.number("amt@Oranges").unwrap();
        assert_eq!(total.number("amt:total"), Some(row_totals));
        assert_eq!(total.number("amt:total"), Some(column_totals));
        assert_eq!(total.number("amt:total"), Some(730.0));
        assert_eq!(total.number(RECORD_COUNT_COLUMN), Some(5.0));
    }

    #[test]
    fn test_rows_sorted_by_row_total() {
        let output = run_horizontal(&sales(), &pivot_config()).unwrap();
        let regions: Vec<CellValue> = output.result.rows.iter().map(|r| r.get("region").clone()).collect();
        assert_eq!(
            regions,
            vec![
                CellValue::text("South"),
                CellValue::text("North"),
                CellValue::text("East"),
                CellValue::text("Total"),
            ]
        );
    }

    #[test]
    fn test_top_n_folds_row_groups() {
        let mut cfg = pivot_config();
        cfg.top_n = Some(1);
        let output = run_horizontal(&sales(), &cfg).unwrap();
        let others = output.result.rows_of(RowKind::Others).next().unwrap();
        assert_eq!(others.get("region"), &CellValue::text("Others"));
        assert_eq!(others.number("amt@Apples"), Some(130.0));
        assert_eq!(others.number("amt:total"), Some(280.0));
        assert_eq!(others.number(RECORD_COUNT_COLUMN), Some(3.0));
        assert_eq!(output.result.rows.last().unwrap().number("amt:total"), Some(730.0));
    }

    #[test]
    fn test_ratio_analysis_shares() {
        let mut cfg = pivot_config();
        cfg.purpose = Purpose::RatioAnalysis;
        let output = run_horizontal(&sales(), &cfg).unwrap();
        let south = row(&output, "South");
        assert!((south.number("amt@Apples:ratio").unwrap() - 200.0 / 730.0).abs() < 1e-9);
        assert!((south.number("amt:total:ratio").unwrap() - 450.0 / 730.0).abs() < 1e-9);
        let total = output.result.rows.last().unwrap();
        assert_eq!(total.number("amt:total:ratio"), Some(1.0));
    }

    #[test]
    fn test_pivot_only_field_uses_all_row() {
        let mut cfg = HorizontalConfig::new()
            .with_group(FieldRef::new("product", "Product"))
            .with_field(FieldRef::new("amt", "Amount"));
        cfg.pivot_field = Some("product".to_string());
        let output = run_horizontal(&sales(), &cfg).unwrap();
        let rows = &output.result.rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(GROUP_COLUMN), &CellValue::text("(all)"));
        assert_eq!(rows[0].number("amt@Apples"), Some(330.0));
        assert_eq!(rows[1].get(GROUP_COLUMN), &CellValue::text("Total"));
    }

    #[test]
    fn test_pivot_value_ordering() {
        let mut labels = vec!["10", "(empty)", "9", "b", "a"];
        labels.sort_by(|a, b| compare_pivot_labels(a, b));
        assert_eq!(labels, vec!["9", "10", "a", "b", "(empty)"]);
    }

    #[test]
    fn test_mixed_pivot_labels_sort_in_tiers() {
        let mut labels: Vec<String> = Vec::new();
        for i in 0..40 {
            labels.push(i.to_string());
            labels.push(format!("{}a", i));
            labels.push(format!("x{}", i));
        }
        labels.push(EMPTY_LABEL.to_string());
        labels.sort_by(|a, b| compare_pivot_labels(a, b));

        let numbers: Vec<String> = (0..40).map(|i| i.to_string()).collect();
        assert_eq!(&labels[..40], numbers.as_slice());
        assert!(labels[40..120].iter().all(|l| l.parse::<f64>().is_err()));
        assert!(labels[40..120].windows(2).all(|w| w[0] < w[1]));
        assert_eq!(labels.last().map(String::as_str), Some(EMPTY_LABEL));
    }

    #[test]
    fn test_pivot_over_many_mixed_labels() {
        let records: Vec<Record> = (0..70)
            .flat_map(|i| {
                vec![
                    sale("North", &i.to_string(), 1.0),
                    sale("North", &format!("{}a", i), 1.0),
                    sale("South", &format!("x{}", i), 1.0),
                ]
            })
            .collect();
        let output = run_horizontal(&records, &pivot_config()).unwrap();
        let value_columns: Vec<&str> = output
            .result
            .columns
            .iter()
            .filter(|c| c.id.starts_with("amt@"))
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(value_columns.len(), 210);
        assert_eq!(&value_columns[..3], &["amt@0", "amt@1", "amt@2"]);
        assert_eq!(output.result.rows.last().unwrap().number("amt:total"), Some(210.0));
    }

    #[test]
    fn test_pivot_value_named_total_keeps_its_cell() {
        let records = vec![sale("North", "total", 5.0), sale("North", "Apples", 100.0)];
        let output = run_horizontal(&records, &pivot_config()).unwrap();
        let ids: Vec<&str> = output.result.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["region", "amt@Apples", "amt@total", "amt:total", "record_count"]);

        let north = row(&output, "North");
        assert_eq!(north.number("amt@total"), Some(5.0));
        assert_eq!(north.number("amt@Apples"), Some(100.0));
        assert_eq!(north.number("amt:total"), Some(105.0));
    }

    #[test]
    fn test_max_over_empty_intersection_is_null() {
        let mut cfg = pivot_config();
        cfg.aggregation = AggregationKind::Max;
        cfg.sort_order = SortOrder::Ascending;
        let output = run_horizontal(&sales(), &cfg).unwrap();
        let east = row(&output, "East");
        assert!(east.get("amt@Oranges").is_null());
        assert_eq!(east.number("amt:total"), Some(30.0));
    }
}
