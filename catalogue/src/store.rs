//! FILENAME: catalogue/src/store.rs
//! PURPOSE: The set of statistics of one project, with source bookkeeping.
//! CONTEXT: Every mutation that touches a source link keeps `dependents`
//! in step with the sources. A rejected mutation leaves the catalogue exactly
//! as it was: all checks run before anything is written.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use engine::{DependencyGraph, RowFilter, StatisticId, StatisticResult};
use crate::error::{CatalogueError, DependencyViolation};
use crate::statistic::{NewStatistic, Source, Statistic, StatisticConfig};

/// The statistic catalogue.
#[derive(Debug, Clone)]
pub struct Catalogue {
    statistics: BTreeMap<StatisticId, Statistic>,
    next_id: StatisticId,
}

impl Catalogue {
    pub fn new() -> Self {
        Catalogue { statistics: BTreeMap::new(), next_id: 1 }
    }

    /// Builds a catalogue from stored statistics, rebuilding `dependents`.
    pub fn from_statistics<I>(statistics: I) -> Result<Self, CatalogueError>
    where
        I: IntoIterator<Item = Statistic>,
    {
        let mut catalogue = Catalogue::new();
        for stat in statistics {
            if catalogue.statistics.contains_key(&stat.id) {
                return Err(CatalogueError::InvalidFormat(format!("duplicate statistic id #{}", stat.id)));
            }
            let after = stat.id.checked_add(1).ok_or_else(|| {
                CatalogueError::InvalidFormat(format!("statistic id #{} leaves no room for new ids", stat.id))
            })?;
            catalogue.next_id = catalogue.next_id.max(after);
            catalogue.statistics.insert(stat.id, stat);
        }
        catalogue.rebuild_dependents();
        Ok(catalogue)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get(&self, id: StatisticId) -> Option<&Statistic> {
        self.statistics.get(&id)
    }

    /// Like `get`, but a missing statistic is an error.
    pub fn require(&self, id: StatisticId) -> Result<&Statistic, CatalogueError> {
        self.statistics.get(&id).ok_or(CatalogueError::NotFound(id))
    }

    /// All statistics, in id order.
    pub fn statistics(&self) -> impl Iterator<Item = &Statistic> {
        self.statistics.values()
    }

    pub fn len(&self) -> usize {
        self.statistics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty()
    }

    /// The statistic `id` reads from, if it reads from one.
    pub fn upstream_of(&self, id: StatisticId) -> Option<&Statistic> {
        let up = self.get(id)?.source.statistic_id()?;
        self.get(up)
    }

    /// Direct dependents of `id`, read from its `dependents` set.
    pub fn downstream_of(&self, id: StatisticId) -> Vec<&Statistic> {
        self.get(id)
            .map(|stat| stat.dependents.iter().filter_map(|dep| self.get(*dep)).collect())
            .unwrap_or_default()
    }

    /// The source graph of the whole catalogue.
    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::from_nodes(self.statistics.values())
    }

    /// The recompute sequence for `id`: `id` first, then its transitive
    /// dependents, each after its ancestors.
    pub fn cascade_order(&self, id: StatisticId) -> Result<Vec<StatisticId>, CatalogueError> {
        self.require(id)?;
        Ok(self.graph().cascade_order(id)?)
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Adds a statistic with empty data and returns its id.
    pub fn create(&mut self, new: NewStatistic) -> Result<StatisticId, CatalogueError> {
        let id = self.next_id;
        let next_id = id
            .checked_add(1)
            .ok_or_else(|| CatalogueError::InvalidFormat("statistic ids exhausted".to_string()))?;
        let name = checked_name(&new.name)?;
        new.config.validate().map_err(|source| CatalogueError::Config { id, source })?;
        let source = self.resolve_source(new.source)?;

        let stat = Statistic {
            id,
            name,
            storage_type: new.storage_type,
            source,
            config: new.config,
            filters: new.filters,
            data: Vec::new(),
            columns: Vec::new(),
            data_range: Default::default(),
            dependents: Default::default(),
            last_updated: None,
        };
        if let Some(up) = stat.source.statistic_id() {
            self.link(id, up);
        }
        self.statistics.insert(id, stat);
        self.next_id = next_id;

        log::debug!("created statistic #{}", id);
        Ok(id)
    }

    /// Renames a statistic; dependents' source names follow.
    pub fn rename(&mut self, id: StatisticId, name: &str) -> Result<(), CatalogueError> {
        let name = checked_name(name)?;
        let dependents = self.require(id)?.dependents.clone();
        for dep in dependents {
            if let Some(Source::Statistic { statistic_name, .. }) =
                self.statistics.get_mut(&dep).map(|stat| &mut stat.source)
            {
                *statistic_name = name.clone();
            }
        }
        if let Some(stat) = self.statistics.get_mut(&id) {
            stat.name = name;
        }
        Ok(())
    }

    /// Replaces the configuration and filters. Stored data is kept until the
    /// next materialization.
    pub fn update_config(
        &mut self,
        id: StatisticId,
        config: StatisticConfig,
        filters: Vec<RowFilter>,
    ) -> Result<(), CatalogueError> {
        self.require(id)?;
        config.validate().map_err(|source| CatalogueError::Config { id, source })?;
        if let Some(stat) = self.statistics.get_mut(&id) {
            stat.config = config;
            stat.filters = filters;
        }
        Ok(())
    }

    /// Points a statistic at a new source.
    ///
    /// Fails if the new upstream does not exist or if it is `id` itself or
    /// one of its descendants.
    pub fn update_source(&mut self, id: StatisticId, source: Source) -> Result<(), CatalogueError> {
        self.require(id)?;
        if let Some(up) = source.statistic_id() {
            if self.graph().would_create_cycle(id, up) {
                return Err(DependencyViolation::WouldCycle { id, upstream: up }.into());
            }
        }
        let source = self.resolve_source(source)?;

        if let Some(old) = self.require(id)?.source.statistic_id() {
            self.unlink(id, old);
        }
        if let Some(up) = source.statistic_id() {
            self.link(id, up);
        }
        if let Some(stat) = self.statistics.get_mut(&id) {
            stat.source = source;
        }
        log::debug!("statistic #{} re-sourced", id);
        Ok(())
    }

    /// Removes a statistic. Fails while anything is sourced from it.
    pub fn delete(&mut self, id: StatisticId) -> Result<Statistic, CatalogueError> {
        let stat = self.require(id)?;
        if !stat.dependents.is_empty() {
            return Err(DependencyViolation::HasDependents {
                id,
                dependents: stat.dependents.iter().copied().collect(),
            }
            .into());
        }
        if let Some(up) = stat.source.statistic_id() {
            self.unlink(id, up);
        }
        let removed = self.statistics.remove(&id).ok_or(CatalogueError::NotFound(id))?;
        log::debug!("deleted statistic #{}", id);
        Ok(removed)
    }

    /// Recomputes every `dependents` set from the sources.
    /// Links to statistics that do not exist are reported and skipped.
    pub fn rebuild_dependents(&mut self) {
        for stat in self.statistics.values_mut() {
            stat.dependents.clear();
        }
        let links: Vec<(StatisticId, StatisticId)> = self
            .statistics
            .values()
            .filter_map(|stat| stat.source.statistic_id().map(|up| (stat.id, up)))
            .collect();
        for (id, up) in links {
            if self.statistics.contains_key(&up) {
                self.link(id, up);
            } else {
                log::warn!("statistic #{} is sourced from missing statistic #{}", id, up);
            }
        }
    }

    /// Replaces a statistic's stored result and bumps `last_updated`.
    pub fn store_result(
        &mut self,
        id: StatisticId,
        result: StatisticResult,
        at: DateTime<Utc>,
    ) -> Result<(), CatalogueError> {
        let stat = self.statistics.get_mut(&id).ok_or(CatalogueError::NotFound(id))?;
        stat.replace_result(result, at);
        Ok(())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Checks that a statistic source exists and fills in its name.
    fn resolve_source(&self, source: Source) -> Result<Source, CatalogueError> {
        match source {
            Source::Statistic { statistic_id, .. } => {
                let upstream = self
                    .get(statistic_id)
                    .ok_or(DependencyViolation::MissingSource(statistic_id))?;
                Ok(Source::Statistic { statistic_id, statistic_name: upstream.name.clone() })
            }
            raw => Ok(raw),
        }
    }

    fn link(&mut self, id: StatisticId, upstream: StatisticId) {
        if let Some(up) = self.statistics.get_mut(&upstream) {
            up.dependents.insert(id);
        }
    }

    fn unlink(&mut self, id: StatisticId, upstream: StatisticId) {
        if let Some(up) = self.statistics.get_mut(&upstream) {
            up.dependents.remove(&id);
        }
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Catalogue::new()
    }
}

fn checked_name(name: &str) -> Result<String, CatalogueError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(CatalogueError::InvalidName(name.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}
