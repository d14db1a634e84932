//! FILENAME: vertical-engine/src/engine.rs
//! Vertical Engine - Turns source records into a bucketed time series.
//!
//! Algorithm:
//! 1. Bucket every record by its time field; records without a usable
//!    timestamp are skipped and reported
//! 2. Aggregate each statistic field per bucket
//! 3. Walk buckets chronologically (the bucket map is ordered by period)
//! 4. Derive cumulative, period-over-period and named comparison series
//! 5. Append one summary row across all buckets

use std::collections::BTreeMap;
use engine::{
    aggregate, change_ratio, mean_present, sum_present, Accumulator, AggregationKind, CellValue,
    ColumnDescriptor, ColumnRole, ConfigError, DataQualityWarning, DataRange, PeriodKey, Record,
    ResultRow, RowKind, RunOptions, RunOutput, StatisticResult, WarningKind, RECORD_COUNT_COLUMN,
};
use crate::definition::{
    compare_delta_column, compare_ratio_column, cumulative_column, pop_delta_column,
    pop_ratio_column, ValueType, VerticalConfig, LABEL_COLUMN, PERIOD_COLUMN,
};

/// Label placed in the summary row's label column.
pub const SUMMARY_LABEL: &str = "Summary";

// ============================================================================
// BUCKETS
// ============================================================================

/// Raw values collected for one period.
#[derive(Debug, Clone)]
struct Bucket {
    record_count: usize,
    /// One accumulator per statistic field.
    accumulators: Vec<Accumulator>,
}

impl Bucket {
    fn new(field_count: usize) -> Self {
        Bucket {
            record_count: 0,
            accumulators: vec![Accumulator::new(); field_count],
        }
    }
}

/// Per-bucket derived series for one statistic field.
#[derive(Debug, Clone, Default)]
struct FieldSeries {
    values: Vec<Option<f64>>,
    cumulative: Vec<f64>,
    pop_ratio: Vec<Option<f64>>,
    pop_delta: Vec<Option<f64>>,
    /// One (ratio, delta) pair of series per configured comparison.
    compares: Vec<(Vec<Option<f64>>, Vec<Option<f64>>)>,
}

// ============================================================================
// VERTICAL CALCULATOR
// ============================================================================

/// The calculation engine for time-series statistics.
pub struct VerticalCalculator<'a> {
    config: &'a VerticalConfig,
    options: RunOptions,

    /// Populated buckets, ordered chronologically.
    buckets: BTreeMap<PeriodKey, Bucket>,

    /// Records skipped because their time field could not be read.
    excluded: usize,
}

impl<'a> VerticalCalculator<'a> {
    /// Creates a calculator after validating the configuration.
    pub fn new(config: &'a VerticalConfig, options: RunOptions) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(VerticalCalculator {
            config,
            options,
            buckets: BTreeMap::new(),
            excluded: 0,
        })
    }

    /// Executes the full calculation.
    pub fn calculate<'r, I>(mut self, records: I) -> Result<RunOutput, ConfigError>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        // Step 1-2: Bucket and accumulate
        self.collect(records);

        let keys: Vec<PeriodKey> = self.buckets.keys().copied().collect();
        let warnings = self.warnings();
        let columns = self.columns();

        if keys.is_empty() {
            log::debug!(
                "vertical run produced no buckets ({} record(s) excluded)",
                self.excluded
            );
            return Ok(RunOutput {
                result: StatisticResult {
                    columns,
                    rows: Vec::new(),
                    data_range: DataRange { excluded_count: self.excluded, ..DataRange::default() },
                },
                warnings,
            });
        }

        // Step 3-4: Derive series per statistic field
        let series = self
            .config
            .statistic_fields
            .iter()
            .enumerate()
            .map(|(idx, _)| self.field_series(idx, &keys))
            .collect::<Result<Vec<_>, _>>()?;

        // Step 5: Emit rows
        let mut rows = Vec::with_capacity(keys.len() + 1);
        for (pos, key) in keys.iter().enumerate() {
            rows.push(self.bucket_row(pos, key, &series));
        }
        rows.push(self.summary_row(&series));

        let record_count = self.buckets.values().map(|b| b.record_count).sum();
        log::debug!(
            "vertical run: {} bucket(s) at {} granularity from {} record(s)",
            keys.len(),
            self.config.granularity,
            record_count
        );

        let data_range = DataRange {
            first_period: keys.first().map(|k| k.to_string()),
            last_period: keys.last().map(|k| k.to_string()),
            record_count,
            excluded_count: self.excluded,
            group_count: keys.len(),
        };

        Ok(RunOutput {
            result: StatisticResult { columns, rows, data_range },
            warnings,
        })
    }

    /// Routes each record into its bucket.
    fn collect<'r, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let field_count = self.config.statistic_fields.len();
        for record in records {
            let key = match engine::bucket_key(record.get(&self.config.time_field), self.config.granularity) {
                Some(key) => key,
                None => {
                    self.excluded += 1;
                    continue;
                }
            };

            let bucket = self.buckets.entry(key).or_insert_with(|| Bucket::new(field_count));
            bucket.record_count += 1;
            for (acc, field) in bucket.accumulators.iter_mut().zip(&self.config.statistic_fields) {
                acc.add(record.get(&field.field_id));
            }
        }
    }

    fn warnings(&self) -> Vec<DataQualityWarning> {
        let mut warnings = Vec::new();
        if self.excluded > 0 {
            log::warn!(
                "{} record(s) skipped: no usable timestamp in '{}'",
                self.excluded,
                self.config.time_field
            );
            warnings.push(DataQualityWarning::new(
                self.config.time_field.clone(),
                WarningKind::UnparseableTime,
                self.excluded,
            ));
        }
        for (idx, field) in self.config.statistic_fields.iter().enumerate() {
            let count: usize = self.buckets.values().map(|b| b.accumulators[idx].non_numeric).sum();
            if count > 0 {
                let warning = DataQualityWarning::new(field.field_id.clone(), WarningKind::NonNumeric, count);
                log::warn!("{}", warning);
                warnings.push(warning);
            }
        }
        warnings
    }

    /// Aggregated value of one field in one bucket.
    fn value_at(&self, key: &PeriodKey, field_idx: usize) -> Option<f64> {
        self.buckets
            .get(key)
            .and_then(|b| b.accumulators[field_idx].compute(self.config.aggregation))
    }

    fn field_series(&self, field_idx: usize, keys: &[PeriodKey]) -> Result<FieldSeries, ConfigError> {
        let values: Vec<Option<f64>> = keys.iter().map(|k| self.value_at(k, field_idx)).collect();

        let mut running = 0.0;
        let cumulative = values
            .iter()
            .map(|v| {
                running += v.unwrap_or(0.0);
                running
            })
            .collect();

        let mut pop_ratio = Vec::with_capacity(keys.len());
        let mut pop_delta = Vec::with_capacity(keys.len());
        for (key, current) in keys.iter().zip(&values) {
            let (ratio, delta) = self.against_key(*current, key.previous(), field_idx)?;
            pop_ratio.push(ratio);
            pop_delta.push(delta);
        }

        let mut compares = Vec::with_capacity(self.config.compare_types.len());
        for &compare in &self.config.compare_types {
            let mut ratios = Vec::with_capacity(keys.len());
            let mut deltas = Vec::with_capacity(keys.len());
            for (key, current) in keys.iter().zip(&values) {
                let (ratio, delta) = self.against_key(*current, key.compare(compare), field_idx)?;
                ratios.push(ratio);
                deltas.push(delta);
            }
            compares.push((ratios, deltas));
        }

        Ok(FieldSeries { values, cumulative, pop_ratio, pop_delta, compares })
    }

    /// Like `against`, for a base period that may fall outside the calendar.
    fn against_key(
        &self,
        current: Option<f64>,
        base_key: Result<PeriodKey, ConfigError>,
        field_idx: usize,
    ) -> Result<(Option<f64>, Option<f64>), ConfigError> {
        match base_key {
            Ok(key) => Ok(self.against(current, &key, field_idx)),
            Err(ConfigError::MalformedPeriod { .. }) => Ok((None, None)),
            Err(err) => Err(err),
        }
    }

    /// Ratio and delta of `current` against the bucket at `base_key`.
    /// Both are null when that bucket holds no records.
    fn against(&self, current: Option<f64>, base_key: &PeriodKey, field_idx: usize) -> (Option<f64>, Option<f64>) {
        if !self.buckets.contains_key(base_key) {
            return (None, None);
        }
        match (current, self.value_at(base_key, field_idx)) {
            (Some(cur), Some(base)) => (change_ratio(cur, base), Some(cur - base)),
            _ => (None, None),
        }
    }

    fn columns(&self) -> Vec<ColumnDescriptor> {
        let mut columns = vec![
            ColumnDescriptor::new(PERIOD_COLUMN, "Period", ColumnRole::Dimension),
            ColumnDescriptor::new(LABEL_COLUMN, "Label", ColumnRole::Dimension),
        ];
        for field in &self.config.statistic_fields {
            let id = &field.field_id;
            let label = field.display();
            if self.config.wants(ValueType::Absolute) {
                columns.push(ColumnDescriptor::new(id.clone(), label, ColumnRole::Value));
            }
            if self.config.wants(ValueType::Cumulative) {
                columns.push(ColumnDescriptor::new(
                    cumulative_column(id),
                    format!("{} (cumulative)", label),
                    ColumnRole::Cumulative,
                ));
            }
            if self.config.wants(ValueType::PeriodOverPeriod) {
                columns.push(ColumnDescriptor::new(
                    pop_ratio_column(id),
                    format!("{} period-over-period %", label),
                    ColumnRole::Ratio,
                ));
                columns.push(ColumnDescriptor::new(
                    pop_delta_column(id),
                    format!("{} period-over-period change", label),
                    ColumnRole::Delta,
                ));
            }
            for &compare in &self.config.compare_types {
                columns.push(ColumnDescriptor::new(
                    compare_ratio_column(id, compare),
                    format!("{} vs {} %", label, compare.name()),
                    ColumnRole::Ratio,
                ));
                columns.push(ColumnDescriptor::new(
                    compare_delta_column(id, compare),
                    format!("{} vs {} change", label, compare.name()),
                    ColumnRole::Delta,
                ));
            }
        }
        columns.push(ColumnDescriptor::new(RECORD_COUNT_COLUMN, "Records", ColumnRole::RecordCount));
        columns
    }

    fn bucket_row(&self, pos: usize, key: &PeriodKey, series: &[FieldSeries]) -> ResultRow {
        let mut row = ResultRow::new(RowKind::Normal);
        row.set(PERIOD_COLUMN, CellValue::text(key.to_string()));
        row.set(LABEL_COLUMN, CellValue::text(key.label()));
        row.is_complete = Some(key.is_complete(self.options.now));

        for (field, s) in self.config.statistic_fields.iter().zip(series) {
            let id = &field.field_id;
            if self.config.wants(ValueType::Absolute) {
                row.set(id.clone(), s.values[pos]);
            }
            if self.config.wants(ValueType::Cumulative) {
                row.set(cumulative_column(id), s.cumulative[pos]);
            }
            if self.config.wants(ValueType::PeriodOverPeriod) {
                row.set(pop_ratio_column(id), s.pop_ratio[pos]);
                row.set(pop_delta_column(id), s.pop_delta[pos]);
            }
            for (&compare, (ratios, deltas)) in self.config.compare_types.iter().zip(&s.compares) {
                row.set(compare_ratio_column(id, compare), ratios[pos]);
                row.set(compare_delta_column(id, compare), deltas[pos]);
            }
        }

        let count = self.buckets.get(key).map_or(0, |b| b.record_count);
        row.set(RECORD_COUNT_COLUMN, count as f64);
        row
    }

    /// Trailing row across all buckets.
    /// Ratio and delta columns hold the mean of the non-null bucket values.
    fn summary_row(&self, series: &[FieldSeries]) -> ResultRow {
        let mut row = ResultRow::new(RowKind::Summary);
        row.set(PERIOD_COLUMN, CellValue::Null);
        row.set(LABEL_COLUMN, CellValue::text(SUMMARY_LABEL));

        for (field, s) in self.config.statistic_fields.iter().zip(series) {
            let id = &field.field_id;
            if self.config.wants(ValueType::Absolute) {
                row.set(id.clone(), summarize(&s.values, self.config.aggregation));
            }
            if self.config.wants(ValueType::Cumulative) {
                row.set(cumulative_column(id), s.cumulative.last().copied());
            }
            if self.config.wants(ValueType::PeriodOverPeriod) {
                row.set(pop_ratio_column(id), mean_present(s.pop_ratio.iter().copied()));
                row.set(pop_delta_column(id), mean_present(s.pop_delta.iter().copied()));
            }
            for (&compare, (ratios, deltas)) in self.config.compare_types.iter().zip(&s.compares) {
                row.set(compare_ratio_column(id, compare), mean_present(ratios.iter().copied()));
                row.set(compare_delta_column(id, compare), mean_present(deltas.iter().copied()));
            }
        }

        let total: usize = self.buckets.values().map(|b| b.record_count).sum();
        row.set(RECORD_COUNT_COLUMN, total as f64);
        row
    }
}

/// Combines per-bucket aggregates into the summary value.
/// sum/count add up, avg averages the buckets, max/min/median reduce the buckets.
fn summarize(values: &[Option<f64>], aggregation: AggregationKind) -> Option<f64> {
    match aggregation {
        AggregationKind::Sum | AggregationKind::Count => Some(sum_present(values.iter().copied())),
        AggregationKind::Avg => mean_present(values.iter().copied()),
        AggregationKind::Max | AggregationKind::Min | AggregationKind::Median => {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            aggregate(&present, aggregation)
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Runs a vertical statistic over `records`.
/// This is the main entry point for the time-series engine.
pub fn run_vertical<'r, I>(records: I, config: &VerticalConfig, options: RunOptions) -> Result<RunOutput, ConfigError>
where
    I: IntoIterator<Item = &'r Record>,
{
    VerticalCalculator::new(config, options)?.calculate(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use engine::{CompareType, FieldRef, FieldValue, Granularity};

    fn now() -> RunOptions {
        RunOptions::at(NaiveDateTime::parse_from_str("2024-02-15 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap())
    }

    fn record(date: &str, amt: impl Into<FieldValue>) -> Record {
        Record::from_pairs([("date", FieldValue::text(date)), ("amt", amt.into())])
    }

    fn sample_records() -> Vec<Record> {
        vec![
            record("2024-01-05", 10.0),
            record("2024-01-20", 5.0),
            record("2024-02-02", 7.0),
        ]
    }

    fn config() -> VerticalConfig {
        let mut cfg = VerticalConfig::new("date", Granularity::Month).with_field(FieldRef::new("amt", "Amount"));
        cfg.value_types = vec![ValueType::Absolute, ValueType::Cumulative, ValueType::PeriodOverPeriod];
        cfg
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map_or(false, |a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_monthly_sum_scenario() {
        let output = run_vertical(&sample_records(), &config(), now()).unwrap();
        let rows = &output.result.rows;
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].get(PERIOD_COLUMN), &CellValue::text("2024-01"));
        assert_eq!(rows[0].number("amt"), Some(15.0));
        assert_eq!(rows[1].get(PERIOD_COLUMN), &CellValue::text("2024-02"));
        assert_eq!(rows[1].number("amt"), Some(7.0));

        assert_eq!(rows[0].number("amt:cumulative"), Some(15.0));
        assert_eq!(rows[1].number("amt:cumulative"), Some(22.0));

        assert_eq!(rows[0].number("amt:pop_ratio"), None);
        assert!(approx(rows[1].number("amt:pop_ratio"), -8.0 / 15.0));
        assert_eq!(rows[1].number("amt:pop_delta"), Some(-8.0));

        let summary = &rows[2];
        assert_eq!(summary.kind, RowKind::Summary);
        assert_eq!(summary.number("amt"), Some(22.0));
        assert_eq!(summary.number(RECORD_COUNT_COLUMN), Some(3.0));
        // Mean of the non-null per-bucket ratios: only February has one.
        assert!(approx(summary.number("amt:pop_ratio"), -8.0 / 15.0));
    }

    #[test]
    fn test_completeness_follows_now() {
        let output = run_vertical(&sample_records(), &config(), now()).unwrap();
        let rows = &output.result.rows;
        assert_eq!(rows[0].is_complete, Some(true));
        assert_eq!(rows[1].is_complete, Some(false));
        assert_eq!(rows[2].is_complete, None);
    }

    #[test]
    fn test_previous_zero_gives_unit_sign() {
        let records = vec![record("2024-01-05", 0.0), record("2024-02-05", -4.0), record("2024-03-05", 0.0)];
        let mut cfg = config();
        cfg.value_types = vec![ValueType::PeriodOverPeriod];
        let rows = run_vertical(&records, &cfg, now()).unwrap().result.rows;

        // 0 -> -4: no base to scale by, so only the sign survives.
        assert_eq!(rows[1].number("amt:pop_ratio"), Some(-1.0));
        // -4 -> 0: scaled by the magnitude of the negative base.
        assert_eq!(rows[2].number("amt:pop_ratio"), Some(1.0));
        assert!(!rows[0].values.contains_key("amt"));
    }

    #[test]
    fn test_gap_month_has_no_previous() {
        let records = vec![record("2024-01-05", 4.0), record("2024-03-05", 6.0)];
        let rows = run_vertical(&records, &config(), now()).unwrap().result.rows;
        assert_eq!(rows[1].get(PERIOD_COLUMN), &CellValue::text("2024-03"));
        assert_eq!(rows[1].number("amt:pop_ratio"), None);
        assert_eq!(rows[1].number("amt:pop_delta"), None);
    }

    #[test]
    fn test_unparseable_times_are_excluded_and_reported() {
        let mut records = sample_records();
        records.push(record("not a date", 100.0));
        records.push(Record::from_pairs([("amt", 1.0)]));
        let output = run_vertical(&records, &config(), now()).unwrap();

        assert_eq!(output.result.data_range.excluded_count, 2);
        assert_eq!(output.result.data_range.record_count, 3);
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].kind, WarningKind::UnparseableTime);
        assert_eq!(output.warnings[0].count, 2);
    }

    #[test]
    fn test_no_usable_records_gives_empty_result() {
        let records = vec![record("??", 1.0)];
        let output = run_vertical(&records, &config(), now()).unwrap();
        assert!(output.result.rows.is_empty());
        assert!(!output.result.columns.is_empty());
    }

    #[test]
    fn test_cumulative_is_non_decreasing_for_non_negative_values() {
        let records: Vec<Record> = (1..=12)
            .map(|m| record(&format!("2023-{:02}-10", m), (m % 4) as f64))
            .collect();
        let rows = run_vertical(&records, &config(), now()).unwrap().result.rows;
        let cumulative: Vec<f64> = rows
            .iter()
            .filter(|r| r.kind == RowKind::Normal)
            .map(|r| r.number("amt:cumulative").unwrap())
            .collect();
        assert_eq!(cumulative.len(), 12);
        assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_year_over_year_comparison() {
        let records = vec![
            record("2023-02-10", 10.0),
            record("2024-01-10", 3.0),
            record("2024-02-10", 15.0),
        ];
        let mut cfg = config();
        cfg.compare_types = vec![CompareType::PreviousYear];
        let rows = run_vertical(&records, &cfg, now()).unwrap().result.rows;

        let feb = rows.iter().find(|r| r.get(PERIOD_COLUMN) == &CellValue::text("2024-02")).unwrap();
        assert!(approx(feb.number("amt:previous_year_ratio"), 0.5));
        assert_eq!(feb.number("amt:previous_year_delta"), Some(5.0));

        let jan = rows.iter().find(|r| r.get(PERIOD_COLUMN) == &CellValue::text("2024-01")).unwrap();
        assert_eq!(jan.number("amt:previous_year_ratio"), None);
    }

    fn row_for<'a>(rows: &'a [ResultRow], period: &str) -> &'a ResultRow {
        rows.iter().find(|r| r.get(PERIOD_COLUMN) == &CellValue::text(period)).unwrap()
    }

    #[test]
    fn test_weekly_series_across_iso_year_boundary() {
        let records = vec![
            record("2019-12-23", 2.0),
            record("2020-01-01", 3.0),
            record("2020-12-29", 4.0),
            record("2021-01-05", 6.0),
        ];
        let mut cfg = config();
        cfg.granularity = Granularity::Week;
        cfg.compare_types = vec![CompareType::PreviousYear];
        let rows = run_vertical(&records, &cfg, now()).unwrap().result.rows;

        let periods: Vec<&CellValue> = rows.iter().map(|r| r.get(PERIOD_COLUMN)).collect();
        assert_eq!(
            periods,
            vec![
                &CellValue::text("2019-W52"),
                &CellValue::text("2020-W01"),
                &CellValue::text("2020-W53"),
                &CellValue::text("2021-W01"),
                &CellValue::Null,
            ]
        );

        let w1 = row_for(&rows, "2021-W01");
        assert_eq!(w1.get(LABEL_COLUMN), &CellValue::text("2021 W01"));
        assert!(approx(w1.number("amt:pop_ratio"), 0.5));
        assert!(approx(w1.number("amt:previous_year_ratio"), 1.0));
        assert_eq!(w1.number("amt:previous_year_delta"), Some(3.0));

        // 2019 has no week 53, so the comparison falls back to week 52.
        let w53 = row_for(&rows, "2020-W53");
        assert!(approx(w53.number("amt:previous_year_ratio"), 1.0));
        assert_eq!(w53.number("amt:previous_year_delta"), Some(2.0));
        assert_eq!(w53.number("amt:pop_ratio"), None);
    }

    #[test]
    fn test_quarterly_year_over_year() {
        let records = vec![
            record("2023-02-10", 10.0),
            record("2023-04-01", 1.0),
            record("2024-03-31", 15.0),
        ];
        let mut cfg = config();
        cfg.granularity = Granularity::Quarter;
        cfg.compare_types = vec![CompareType::PreviousYear];
        let rows = run_vertical(&records, &cfg, now()).unwrap().result.rows;

        let q1 = row_for(&rows, "2024-Q1");
        assert_eq!(q1.get(LABEL_COLUMN), &CellValue::text("Q1 2024"));
        assert!(approx(q1.number("amt:previous_year_ratio"), 0.5));
        assert_eq!(q1.number("amt:pop_ratio"), None);
        assert_eq!(q1.is_complete, Some(false));
        assert_eq!(row_for(&rows, "2023-Q2").number("amt:cumulative"), Some(11.0));
    }

    #[test]
    fn test_far_future_epoch_is_reported_not_bucketed() {
        let mut records = sample_records();
        records.push(Record::from_pairs([("date", FieldValue::Number(8.21e15)), ("amt", FieldValue::Number(1.0))]));
        let output = run_vertical(&records, &config(), now()).unwrap();

        assert_eq!(output.result.data_range.excluded_count, 1);
        assert_eq!(output.warnings[0].kind, WarningKind::UnparseableTime);
        assert_eq!(output.result.rows.len(), 3);
    }

    #[test]
    fn test_summary_for_max_and_avg() {
        let records = vec![
            record("2024-01-01", 2.0),
            record("2024-01-02", 8.0),
            record("2024-02-01", 5.0),
        ];
        let mut cfg = config();
        cfg.aggregation = AggregationKind::Max;
        let rows = run_vertical(&records, &cfg, now()).unwrap().result.rows;
        assert_eq!(rows.last().unwrap().number("amt"), Some(8.0));

        cfg.aggregation = AggregationKind::Avg;
        let rows = run_vertical(&records, &cfg, now()).unwrap().result.rows;
        // Buckets average to 5 and 5.
        assert_eq!(rows.last().unwrap().number("amt"), Some(5.0));
    }

    #[test]
    fn test_count_includes_non_numeric_values() {
        let records = vec![record("2024-01-01", "n/a"), record("2024-01-02", 3.0)];
        let mut cfg = config();
        cfg.aggregation = AggregationKind::Count;
        let output = run_vertical(&records, &cfg, now()).unwrap();
        assert_eq!(output.result.rows[0].number("amt"), Some(2.0));
        assert_eq!(output.warnings[0].kind, WarningKind::NonNumeric);
    }

    #[test]
    fn test_invalid_config_fails_before_work() {
        let mut cfg = config();
        cfg.statistic_fields.clear();
        assert_eq!(
            run_vertical(&sample_records(), &cfg, now()).unwrap_err(),
            ConfigError::Missing("statisticFields")
        );
    }
}
