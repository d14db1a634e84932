//! FILENAME: catalogue/src/error.rs
//! PURPOSE: Error types for catalogue edits, recomputation and snapshots.

use thiserror::Error;
use engine::{ConfigError, CycleError, StatisticId};

/// A change that would break the source graph.
/// The catalogue is left untouched when one is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DependencyViolation {
    #[error("statistic #{id} still has dependents: {dependents:?}")]
    HasDependents { id: StatisticId, dependents: Vec<StatisticId> },

    #[error("source statistic #{0} does not exist")]
    MissingSource(StatisticId),

    #[error("sourcing statistic #{id} from #{upstream} would create a cycle")]
    WouldCycle { id: StatisticId, upstream: StatisticId },
}

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("Statistic not found: #{0}")]
    NotFound(StatisticId),

    #[error("Invalid statistic name: {0:?}")]
    InvalidName(String),

    #[error("Configuration error in statistic #{id}: {source}")]
    Config {
        id: StatisticId,
        #[source]
        source: ConfigError,
    },

    #[error("Dependency violation: {0}")]
    Dependency(#[from] DependencyViolation),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error("Record source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Cascade stopped at statistic #{failed} (completed: {completed:?}): {source}")]
    Cascade {
        failed: StatisticId,
        completed: Vec<StatisticId>,
        #[source]
        source: Box<CatalogueError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid snapshot: {0}")]
    InvalidFormat(String),
}

impl CatalogueError {
    /// The statistic a cascade stopped at, if this is a cascade failure.
    pub fn failed_statistic(&self) -> Option<StatisticId> {
        match self {
            CatalogueError::Cascade { failed, .. } => Some(*failed),
            _ => None,
        }
    }
}
