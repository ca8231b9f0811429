//! Read/write snapshot JSON files.
//!
//! Snapshot JSON is the "portable" representation of a trained model:
//! - network weights
//! - the vocabulary those weights were trained on
//! - the ranges in force at save time (informational; warm start recomputes them)
//! - the training report, when there was one
//!
//! Only the weights are reused on load. Vocabulary and ranges are always
//! rebuilt from the live population.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fit::{TrainingReport, WarmStart};
use crate::math::MinMax;
use crate::models::{LocationVocabulary, ModelSnapshot, Network, SnapshotOrigin};

/// Bumped whenever the layout below changes incompatibly.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub tool: String,
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub origin: SnapshotOrigin,
    pub vocabulary: LocationVocabulary,
    pub xp_range: MinMax,
    pub output_range: MinMax,
    pub network: Network,
    #[serde(default)]
    pub report: Option<TrainingReport>,
}

impl SnapshotFile {
    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Self {
        Self {
            tool: "coherence".to_string(),
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: Utc::now(),
            origin: snapshot.origin(),
            vocabulary: snapshot.vocabulary().clone(),
            xp_range: snapshot.xp_range(),
            output_range: snapshot.output_range(),
            network: snapshot.network().clone(),
            report: snapshot.report().cloned(),
        }
    }

    pub fn into_warm_start(self) -> WarmStart {
        WarmStart {
            vocabulary: self.vocabulary,
            network: self.network,
        }
    }
}

/// Write a snapshot JSON file, creating parent directories as needed.
pub fn save_snapshot(path: &Path, snapshot: &ModelSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::Persistence(format!("Failed to create snapshot directory '{}': {e}", parent.display()))
        })?;
    }
    let file = File::create(path)
        .map_err(|e| Error::Persistence(format!("Failed to create snapshot '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &SnapshotFile::from_snapshot(snapshot))
        .map_err(|e| Error::Persistence(format!("Failed to write snapshot JSON: {e}")))?;
    Ok(())
}

/// Read a snapshot JSON file. A missing file is `Ok(None)`, not an error.
pub fn load_snapshot(path: &Path) -> Result<Option<SnapshotFile>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Persistence(format!(
                "Failed to open snapshot '{}': {e}",
                path.display()
            )));
        }
    };

    let snap: SnapshotFile = serde_json::from_reader(file)
        .map_err(|e| Error::Persistence(format!("Invalid snapshot JSON: {e}")))?;
    if snap.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(Error::Persistence(format!(
            "Unsupported snapshot format version {} (expected {SNAPSHOT_FORMAT_VERSION})",
            snap.format_version
        )));
    }
    Ok(Some(snap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompensationRecord, TrainingConfig};
    use crate::fit::fit_snapshot;

    fn trained() -> ModelSnapshot {
        let records: Vec<CompensationRecord> = (0..12)
            .map(|i| CompensationRecord::new(["A", "B"][i % 2], Some(i as f64), 30_000.0 + 1_000.0 * i as f64))
            .collect();
        let config = TrainingConfig {
            seed: Some(11),
            max_epochs: 5,
            ..TrainingConfig::default()
        };
        fit_snapshot(&records, &config, None)
    }

    #[test]
    fn save_then_load_keeps_weights_and_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");
        let snap = trained();

        save_snapshot(&path, &snap).unwrap();
        let loaded = load_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded.format_version, SNAPSHOT_FORMAT_VERSION);
        assert_eq!(&loaded.vocabulary, snap.vocabulary());
        assert_eq!(&loaded.network, snap.network());
        assert_eq!(loaded.origin, SnapshotOrigin::Trained);
        assert!(loaded.report.is_some());

        let warm = loaded.into_warm_start();
        assert_eq!(warm.vocabulary.entries(), ["other", "A", "B"]);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn corrupt_or_foreign_files_are_persistence_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_snapshot(&path), Err(Error::Persistence(_))));

        let snap = trained();
        let mut file = SnapshotFile::from_snapshot(&snap);
        file.format_version = 99;
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();
        assert!(matches!(load_snapshot(&path), Err(Error::Persistence(_))));
    }
}
