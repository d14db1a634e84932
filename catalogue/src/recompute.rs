//! FILENAME: catalogue/src/recompute.rs
//! PURPOSE: Materializes statistics and runs cascades.
//! CONTEXT: The record store is an external collaborator, injected as a
//! `RecordSource`. A statistic sourced from another statistic reads that
//! statistic's stored rows, so a cascade must run strictly upstream-first:
//! each step reads what the previous step just stored.

use std::collections::BTreeMap;
use chrono::Utc;
use engine::{
    apply_filters, DataQualityWarning, FieldValue, Record, RunOptions, RunOutput, StatisticId,
};
use horizontal_engine::run_horizontal;
use vertical_engine::run_vertical;
use crate::error::{CatalogueError, DependencyViolation};
use crate::statistic::{Source, Statistic, StatisticConfig};
use crate::store::Catalogue;

// ============================================================================
// RECORD SOURCE
// ============================================================================

/// Supplies the raw records of a form.
pub trait RecordSource {
    fn records(&self, form_id: &str) -> Result<Vec<Record>, CatalogueError>;
}

/// A record source held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    forms: BTreeMap<String, Vec<Record>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        InMemorySource::default()
    }

    pub fn with_form(mut self, form_id: impl Into<String>, records: Vec<Record>) -> Self {
        self.insert_form(form_id, records);
        self
    }

    /// Adds or replaces a form's records.
    pub fn insert_form(&mut self, form_id: impl Into<String>, records: Vec<Record>) {
        self.forms.insert(form_id.into(), records);
    }
}

impl RecordSource for InMemorySource {
    fn records(&self, form_id: &str) -> Result<Vec<Record>, CatalogueError> {
        self.forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| CatalogueError::SourceUnavailable(format!("unknown form '{}'", form_id)))
    }
}

/// Converts a statistic's stored rows into records for a dependent.
/// Only group and Others rows are carried; summary, subtotal and total rows
/// are roll-ups of those.
pub fn rows_as_records(stat: &Statistic) -> Vec<Record> {
    stat.data
        .iter()
        .filter(|row| row.kind.is_detail())
        .map(|row| {
            Record::from_pairs(row.values.iter().map(|(column, cell)| (column.clone(), FieldValue::from(cell))))
        })
        .collect()
}

// ============================================================================
// RECOMPUTER
// ============================================================================

/// Outcome of a completed cascade.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CascadeReport {
    /// The planned sequence.
    pub order: Vec<StatisticId>,
    /// Statistics recomputed, in order.
    pub updated: Vec<StatisticId>,
    /// Data-quality warnings raised along the way.
    pub warnings: Vec<(StatisticId, DataQualityWarning)>,
}

/// Runs statistics against an injected record source.
pub struct Recomputer<'s, S: RecordSource + ?Sized> {
    source: &'s S,
    options: Option<RunOptions>,
}

impl<'s, S: RecordSource + ?Sized> Recomputer<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Recomputer { source, options: None }
    }

    /// Fixes the reference instant instead of reading the clock per run.
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Computes a statistic without storing the result.
    pub fn compute(&self, catalogue: &Catalogue, id: StatisticId) -> Result<RunOutput, CatalogueError> {
        let stat = catalogue.require(id)?;

        let records = match &stat.source {
            Source::RawForm { form_id, .. } => self.source.records(form_id)?,
            Source::Statistic { statistic_id, .. } => {
                let upstream = catalogue
                    .get(*statistic_id)
                    .ok_or(DependencyViolation::MissingSource(*statistic_id))?;
                rows_as_records(upstream)
            }
        };
        let filtered = apply_filters(&records, &stat.filters);

        let output = match &stat.config {
            StatisticConfig::Vertical(config) => {
                let options = self.options.unwrap_or_default();
                run_vertical(filtered.iter().copied(), config, options)
            }
            StatisticConfig::Horizontal(config) => run_horizontal(filtered.iter().copied(), config),
        }
        .map_err(|source| CatalogueError::Config { id, source })?;

        for warning in &output.warnings {
            log::warn!("statistic #{}: {}", id, warning);
        }
        Ok(output)
    }

    /// Computes a statistic and stores its result wholesale.
    pub fn update(
        &self,
        catalogue: &mut Catalogue,
        id: StatisticId,
    ) -> Result<Vec<DataQualityWarning>, CatalogueError> {
        let RunOutput { result, warnings } = self.compute(catalogue, id)?;
        log::debug!("statistic #{}: storing {} row(s)", id, result.rows.len());
        catalogue.store_result(id, result, Utc::now())?;
        Ok(warnings)
    }

    /// Recomputes `id` and everything transitively sourced from it.
    ///
    /// Stops at the first failure: statistics already recomputed keep their
    /// new data, the rest keep their old data.
    pub fn cascade(&self, catalogue: &mut Catalogue, id: StatisticId) -> Result<CascadeReport, CatalogueError> {
        let order = catalogue.cascade_order(id)?;
        log::info!("cascade from #{}: {:?}", id, order);

        let mut report = CascadeReport { order: order.clone(), ..CascadeReport::default() };
        for &step in &order {
            match self.update(catalogue, step) {
                Ok(warnings) => {
                    report.updated.push(step);
                    report.warnings.extend(warnings.into_iter().map(|w| (step, w)));
                }
                Err(err) => {
                    log::warn!("cascade from #{} stopped at #{}: {}", id, step, err);
                    return Err(CatalogueError::Cascade {
                        failed: step,
                        completed: report.updated,
                        source: Box::new(err),
                    });
                }
            }
        }

        log::info!("cascade from #{} updated {} statistic(s)", id, report.updated.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{CellValue, ResultRow, RowKind, StatisticResult};
    use crate::statistic::NewStatistic;
    use engine::{FieldRef, Granularity};
    use vertical_engine::VerticalConfig;

    #[test]
    fn test_rows_as_records_skips_rollups() {
        let mut catalogue = Catalogue::new();
        let config = VerticalConfig::new("date", Granularity::Month).with_field(FieldRef::new("amt", "Amount"));
        let id = catalogue
            .create(NewStatistic::new("A", Source::raw_form("orders"), config))
            .unwrap();

        let mut normal = ResultRow::new(RowKind::Normal);
        normal.set("period", CellValue::text("2024-01"));
        normal.set("amt", 15.0);
        let mut summary = ResultRow::new(RowKind::Summary);
        summary.set("amt", 15.0);
        let result = StatisticResult { rows: vec![normal, summary], ..StatisticResult::default() };
        catalogue.store_result(id, result, Utc::now()).unwrap();

        let records = rows_as_records(catalogue.get(id).unwrap());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("period"), &FieldValue::text("2024-01"));
        assert_eq!(records[0].get("amt"), &FieldValue::Number(15.0));
    }

    #[test]
    fn test_unknown_form_is_unavailable() {
        let source = InMemorySource::new();
        assert!(matches!(source.records("nope"), Err(CatalogueError::SourceUnavailable(_))));
    }
}
