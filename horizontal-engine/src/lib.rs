//! FILENAME: horizontal-engine/src/lib.rs
//! Horizontal statistics: dimensional grouping and pivot cross-tabs.
//!
//! This crate depends on `engine` only for shared types (records, result
//! rows, aggregation).
//!
//! Layers:
//! - `definition`: Serializable configuration (what the statistic IS)
//! - `cache`: Records routed into groups (HOW we collect)
//! - `engine`: Flat grouping with Top-N, ratios and subtotals
//! - `pivot`: Cross-tab layout when a pivot field is configured

pub mod definition;
pub mod cache;
pub mod engine;
pub mod pivot;

pub use definition::*;
pub use cache::{Group, GroupCache, GroupKey};
pub use crate::engine::{run_horizontal, HorizontalCalculator};
pub use pivot::PivotCalculator;
