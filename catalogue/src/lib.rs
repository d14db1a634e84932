//! FILENAME: catalogue/src/lib.rs
//! Statistic catalogue and recompute service.
//!
//! Holds the statistics of one project, keeps each statistic's `dependents`
//! consistent with the sources, and materializes statistics through the
//! vertical and horizontal engines. The record store is injected through
//! `RecordSource`; nothing here reaches for global state.
//!
//! Layers:
//! - `statistic`: The persisted statistic model
//! - `store`: The catalogue and its source bookkeeping
//! - `recompute`: Single-statistic updates and cascades
//! - `format`: JSON snapshots

mod error;
pub mod format;
pub mod recompute;
pub mod statistic;
pub mod store;

pub use error::{CatalogueError, DependencyViolation};
pub use format::{from_json, load_catalogue, save_catalogue, to_json, SNAPSHOT_VERSION};
pub use recompute::{rows_as_records, CascadeReport, InMemorySource, RecordSource, Recomputer};
pub use statistic::{NewStatistic, Orientation, Source, Statistic, StatisticConfig, StorageType};
pub use store::Catalogue;
