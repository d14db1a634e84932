//! FILENAME: catalogue/src/format.rs
//! PURPOSE: JSON snapshot of a whole catalogue.
//! CONTEXT: A snapshot stores every statistic with its last result. Loaded
//! snapshots are not trusted for `dependents`: the sets are rebuilt from the
//! sources on load.

use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::CatalogueError;
use crate::statistic::Statistic;
use crate::store::Catalogue;

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    version: u32,
    statistics: Vec<Statistic>,
}

/// Serializes the catalogue as pretty JSON.
pub fn to_json(catalogue: &Catalogue) -> Result<String, CatalogueError> {
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        statistics: catalogue.statistics().cloned().collect(),
    };
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Parses a snapshot and rebuilds the catalogue.
pub fn from_json(json: &str) -> Result<Catalogue, CatalogueError> {
    let snapshot: Snapshot = serde_json::from_str(json)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(CatalogueError::InvalidFormat(format!(
            "unsupported snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Catalogue::from_statistics(snapshot.statistics)
}

/// Writes the catalogue to `path`.
pub fn save_catalogue(catalogue: &Catalogue, path: &Path) -> Result<(), CatalogueError> {
    let json = to_json(catalogue)?;
    fs::write(path, json)?;
    log::info!("saved {} statistic(s) to {}", catalogue.len(), path.display());
    Ok(())
}

/// Reads a catalogue from `path`.
pub fn load_catalogue(path: &Path) -> Result<Catalogue, CatalogueError> {
    let json = fs::read_to_string(path)?;
    let catalogue = from_json(&json)?;
    log::info!("loaded {} statistic(s) from {}", catalogue.len(), path.display());
    Ok(catalogue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_version() {
        let err = from_json(r#"{"version": 7, "statistics": []}"#).unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidFormat(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(from_json("{not json"), Err(CatalogueError::Json(_))));
    }

    #[test]
    fn test_empty_catalogue() {
        let json = to_json(&Catalogue::new()).unwrap();
        let loaded = from_json(&json).unwrap();
        assert!(loaded.is_empty());
    }
}
