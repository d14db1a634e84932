//! FILENAME: horizontal-engine/src/cache.rs
//! Group Cache - Records routed into their groups.
//!
//! A single pass over the source records builds one `Group` per distinct
//! tuple of group-field labels. Groups keep first-appearance order, which
//! is the tie-break whenever two groups sort equal.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use engine::{
    Accumulator, AggregationKind, DataQualityWarning, FieldRef, Record, WarningKind,
};

/// Group labels, outermost field first.
pub type GroupKey = SmallVec<[String; 4]>;

/// One group's collected values.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: GroupKey,
    pub record_count: usize,
    /// One accumulator per statistic field.
    accumulators: Vec<Accumulator>,
}

impl Group {
    /// Aggregated value per statistic field.
    pub fn values(&self, kind: AggregationKind) -> Vec<Option<f64>> {
        self.accumulators.iter().map(|acc| acc.compute(kind)).collect()
    }
}

/// All groups of one run.
#[derive(Debug, Clone, Default)]
pub struct GroupCache {
    pub groups: Vec<Group>,
    /// Records seen, across every group.
    pub record_count: usize,
    /// Non-numeric values seen per statistic field.
    non_numeric: Vec<usize>,
}

impl GroupCache {
    /// Routes every record into the group of its labels for `group_fields`.
    pub fn build<'r, I>(records: I, group_fields: &[&FieldRef], statistic_fields: &[FieldRef]) -> Self
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();
        let mut groups: Vec<Group> = Vec::new();
        let mut record_count = 0;

        for record in records {
            record_count += 1;
            let key: GroupKey = group_fields
                .iter()
                .map(|field| record.get(&field.field_id).group_label())
                .collect();

            let idx = match index.get(&key) {
                Some(&idx) => idx,
                None => {
                    let idx = groups.len();
                    index.insert(key.clone(), idx);
                    groups.push(Group {
                        key,
                        record_count: 0,
                        accumulators: vec![Accumulator::new(); statistic_fields.len()],
                    });
                    idx
                }
            };

            let group = &mut groups[idx];
            group.record_count += 1;
            for (acc, field) in group.accumulators.iter_mut().zip(statistic_fields) {
                acc.add(record.get(&field.field_id));
            }
        }

        let non_numeric: Vec<usize> = (0..statistic_fields.len())
            .map(|i| groups.iter().map(|g| g.accumulators[i].non_numeric).sum::<usize>())
            .collect();

        GroupCache { groups, record_count, non_numeric }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Non-numeric values found in statistic fields, one warning per field.
    pub fn warnings(&self, statistic_fields: &[FieldRef]) -> Vec<DataQualityWarning> {
        statistic_fields
            .iter()
            .zip(&self.non_numeric)
            .filter(|(_, count)| **count > 0)
            .map(|(field, &count)| {
                let warning = DataQualityWarning::new(field.field_id.clone(), WarningKind::NonNumeric, count);
                log::warn!("{}", warning);
                warning
            })
            .collect()
    }
}
