//! FILENAME: horizontal-engine/src/engine.rs
//! Horizontal Engine - Flat grouping with Top-N, ratios and subtotals.
//!
//! Algorithm:
//! 1. Group records by the tuple of all group-field labels
//! 2. Aggregate each statistic field per group
//! 3. Sort groups by the sort field (stable, so ties keep first appearance)
//! 4. Fold groups beyond Top-N into a single "Others" line
//! 5. Ratio analysis: share of the grand total and running cumulative share
//! 6. Subtotal lines after each run sharing the first-level label
//! 7. One grand-total line over every original group
//!
//! Configurations with a pivot field are handed to `pivot.rs`.

use std::cmp::Ordering;
use engine::{
    sum_present, CellValue, ColumnDescriptor, ColumnRole, ConfigError, DataRange, FieldRef, Record,
    ResultRow, RowKind, RunOutput, StatisticResult, RECORD_COUNT_COLUMN,
};
use crate::cache::GroupCache;
use crate::definition::{
    cumulative_ratio_column, ratio_column, HorizontalConfig, SortOrder, OTHERS_LABEL,
    SUBTOTAL_LABEL, TOTAL_LABEL,
};
use crate::pivot::PivotCalculator;

// ============================================================================
// OUTPUT LINES
// ============================================================================

/// One emitted row before it is rendered into columns.
#[derive(Debug, Clone)]
struct Line {
    kind: RowKind,
    /// One label per group field.
    labels: Vec<CellValue>,
    /// One value per statistic field.
    values: Vec<Option<f64>>,
    ratios: Vec<Option<f64>>,
    cumulative: Vec<Option<f64>>,
    record_count: usize,
}

impl Line {
    fn new(kind: RowKind, labels: Vec<CellValue>, values: Vec<Option<f64>>, record_count: usize) -> Self {
        let width = values.len();
        Line {
            kind,
            labels,
            values,
            ratios: vec![None; width],
            cumulative: vec![None; width],
            record_count,
        }
    }
}

/// Group-column labels for a synthetic row: `first`, then nulls.
pub(crate) fn marker_labels(first: &str, width: usize) -> Vec<CellValue> {
    let mut labels = vec![CellValue::Null; width.max(1)];
    labels[0] = CellValue::text(first);
    labels
}

/// Orders two sort values; absent values always sort last.
pub(crate) fn compare_sort_values(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sum of the present values, or `None` when every value is absent.
pub(crate) fn sum_if_any<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

// ============================================================================
// HORIZONTAL CALCULATOR
// ============================================================================

/// The calculation engine for flat (non-pivot) grouping statistics.
pub struct HorizontalCalculator<'a> {
    config: &'a HorizontalConfig,
    group_fields: Vec<&'a FieldRef>,
}

impl<'a> HorizontalCalculator<'a> {
    /// Creates a calculator after validating the configuration.
    pub fn new(config: &'a HorizontalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(HorizontalCalculator {
            config,
            group_fields: config.group_fields.iter().collect(),
        })
    }

    /// Executes the full calculation.
    pub fn calculate<'r, I>(self, records: I) -> RunOutput
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let config = self.config;

        // Step 1-2: Group and aggregate
        let cache = GroupCache::build(records, &self.group_fields, &config.statistic_fields);
        let warnings = cache.warnings(&config.statistic_fields);
        let columns = self.columns();

        if cache.is_empty() {
            log::debug!("horizontal run produced no groups");
            return RunOutput {
                result: StatisticResult { columns, rows: Vec::new(), data_range: DataRange::default() },
                warnings,
            };
        }

        let values: Vec<Vec<Option<f64>>> =
            cache.groups.iter().map(|g| g.values(config.aggregation)).collect();
        let field_count = config.statistic_fields.len();

        // Grand totals cover every group, before any folding.
        let grand_totals: Vec<f64> = (0..field_count)
            .map(|i| sum_present(values.iter().map(|v| v[i])))
            .collect();

        // Step 3: Sort
        let sort_idx = config.sort_index();
        let mut order: Vec<usize> = (0..cache.groups.len()).collect();
        order.sort_by(|&a, &b| compare_sort_values(values[a][sort_idx], values[b][sort_idx], config.sort_order));

        // Step 4: Top-N
        let keep = config.top_n.map_or(order.len(), |n| n.min(order.len()));
        let mut lines: Vec<Line> = order[..keep]
            .iter()
            .map(|&g| {
                let group = &cache.groups[g];
                let labels = group.key.iter().map(|label| CellValue::text(label.as_str())).collect();
                Line::new(RowKind::Normal, labels, values[g].clone(), group.record_count)
            })
            .collect();

        let folded = &order[keep..];
        if !folded.is_empty() {
            let others: Vec<Option<f64>> = (0..field_count)
                .map(|i| Some(sum_present(folded.iter().map(|&g| values[g][i]))))
                .collect();
            let count = folded.iter().map(|&g| cache.groups[g].record_count).sum();
            log::debug!("folded {} group(s) into '{}'", folded.len(), OTHERS_LABEL);
            lines.push(Line::new(
                RowKind::Others,
                marker_labels(OTHERS_LABEL, self.group_fields.len()),
                others,
                count,
            ));
        }

        // Step 5: Ratios
        if config.is_ratio_analysis() {
            apply_ratios(&mut lines, &grand_totals);
        }

        // Step 6: Subtotals
        if config.show_subtotal && self.group_fields.len() > 1 {
            lines = insert_subtotals(lines, self.group_fields.len());
        }

        // Step 7: Grand total
        let mut total = Line::new(
            RowKind::Total,
            marker_labels(TOTAL_LABEL, self.group_fields.len()),
            grand_totals.iter().map(|&t| Some(t)).collect(),
            cache.record_count,
        );
        if config.is_ratio_analysis() {
            for (i, &grand) in grand_totals.iter().enumerate() {
                let share = if grand == 0.0 { None } else { Some(1.0) };
                total.ratios[i] = share;
                total.cumulative[i] = share;
            }
        }
        lines.push(total);

        log::debug!(
            "horizontal run: {} group(s), {} row(s) emitted from {} record(s)",
            cache.groups.len(),
            lines.len(),
            cache.record_count
        );

        let rows = lines.iter().map(|line| self.render(line)).collect();
        RunOutput {
            result: StatisticResult {
                columns,
                rows,
                data_range: DataRange {
                    record_count: cache.record_count,
                    group_count: cache.groups.len(),
                    ..DataRange::default()
                },
            },
            warnings,
        }
    }

    fn columns(&self) -> Vec<ColumnDescriptor> {
        let mut columns: Vec<ColumnDescriptor> = self
            .group_fields
            .iter()
            .map(|f| ColumnDescriptor::new(f.field_id.clone(), f.display(), ColumnRole::Dimension))
            .collect();
        for field in &self.config.statistic_fields {
            columns.push(ColumnDescriptor::new(field.field_id.clone(), field.display(), ColumnRole::Value));
        }
        if self.config.is_ratio_analysis() {
            for field in &self.config.statistic_fields {
                columns.push(ColumnDescriptor::new(
                    ratio_column(&field.field_id),
                    format!("{} share", field.display()),
                    ColumnRole::Ratio,
                ));
                columns.push(ColumnDescriptor::new(
                    cumulative_ratio_column(&field.field_id),
                    format!("{} cumulative share", field.display()),
                    ColumnRole::CumulativeRatio,
                ));
            }
        }
        columns.push(ColumnDescriptor::new(RECORD_COUNT_COLUMN, "Records", ColumnRole::RecordCount));
        columns
    }

    fn render(&self, line: &Line) -> ResultRow {
        let mut row = ResultRow::new(line.kind);
        for (field, label) in self.group_fields.iter().zip(&line.labels) {
            row.set(field.field_id.clone(), label.clone());
        }
        for (i, field) in self.config.statistic_fields.iter().enumerate() {
            row.set(field.field_id.clone(), line.values[i]);
            if self.config.is_ratio_analysis() {
                row.set(ratio_column(&field.field_id), line.ratios[i]);
                row.set(cumulative_ratio_column(&field.field_id), line.cumulative[i]);
            }
        }
        row.set(RECORD_COUNT_COLUMN, line.record_count as f64);
        row
    }
}

/// Share of the grand total per line plus the running share in emitted order.
/// The last line's running share is pinned to exactly 1.0.
fn apply_ratios(lines: &mut [Line], grand_totals: &[f64]) {
    for (i, &grand) in grand_totals.iter().enumerate() {
        if grand == 0.0 {
            continue;
        }
        let mut running = 0.0;
        for line in lines.iter_mut() {
            let share = line.values[i].map(|v| v / grand);
            running += share.unwrap_or(0.0);
            line.ratios[i] = share;
            line.cumulative[i] = Some(running);
        }
        if let Some(last) = lines.last_mut() {
            last.cumulative[i] = Some(1.0);
        }
    }
}

/// Inserts a subtotal after each run of lines sharing their first label.
/// The Others line never joins a run.
fn insert_subtotals(lines: Vec<Line>, width: usize) -> Vec<Line> {
    let mut out: Vec<Line> = Vec::with_capacity(lines.len() * 2);
    let mut run: Vec<Line> = Vec::new();

    for line in lines {
        let joins_run = line.kind == RowKind::Normal
            && run.first().map_or(true, |first| first.labels.first() == line.labels.first());
        if !joins_run {
            flush_run(&mut run, &mut out, width);
        }
        if line.kind == RowKind::Normal {
            run.push(line);
        } else {
            out.push(line);
        }
    }
    flush_run(&mut run, &mut out, width);
    out
}

fn flush_run(run: &mut Vec<Line>, out: &mut Vec<Line>, width: usize) {
    let Some(first) = run.first() else {
        return;
    };
    let field_count = first.values.len();

    let mut labels = vec![CellValue::Null; width];
    labels[0] = first.labels[0].clone();
    labels[1] = CellValue::text(SUBTOTAL_LABEL);

    let values = (0..field_count).map(|i| Some(sum_present(run.iter().map(|l| l.values[i])))).collect();
    let record_count = run.iter().map(|l| l.record_count).sum();
    let mut subtotal = Line::new(RowKind::Subtotal, labels, values, record_count);
    for i in 0..field_count {
        subtotal.ratios[i] = sum_if_any(run.iter().map(|l| l.ratios[i]));
        subtotal.cumulative[i] = run.last().and_then(|l| l.cumulative[i]);
    }

    out.append(run);
    out.push(subtotal);
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Runs a horizontal statistic over `records`.
/// This is the main entry point; a configured pivot field selects the
/// cross-tab layout.
pub fn run_horizontal<'r, I>(records: I, config: &HorizontalConfig) -> Result<RunOutput, ConfigError>
where
    I: IntoIterator<Item = &'r Record>,
{
    if config.pivot_field.is_some() {
        Ok(PivotCalculator::new(config)?.calculate(records))
    } else {
        Ok(HorizontalCalculator::new(config)?.calculate(records))
    }
}
