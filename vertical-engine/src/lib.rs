//! FILENAME: vertical-engine/src/lib.rs
//! Vertical Engine - Time-series statistics over flat records.
//!
//! Architecture:
//! - definition.rs: The serializable statistic configuration
//! - engine.rs: Bucketing, aggregation and the derived series
//!
//! A run is pure: the same records, configuration and reference instant
//! always produce the same result.

pub mod definition;
pub mod engine;

pub use definition::*;
pub use crate::engine::{run_vertical, VerticalCalculator, SUMMARY_LABEL};
