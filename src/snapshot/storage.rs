//! Snapshot metadata persistence
//!
//! One JSON record per snapshot at `{base}/snapshots/{snapshot_id}.json`, written with the
//! temp-file + rename discipline so a record is either fully present or absent.

use crate::atomic;
use crate::error::RollbackError;
use crate::snapshot::types::{Snapshot, SNAPSHOT_FORMAT_VERSION};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const SNAPSHOTS_DIR: &str = "snapshots";
const RECORD_EXTENSION: &str = "json";

pub struct SnapshotRecords {
    dir: PathBuf,
}

impl SnapshotRecords {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, RollbackError> {
        let dir = base_dir.as_ref().join(SNAPSHOTS_DIR);
        fs::create_dir_all(&dir).map_err(|e| {
            RollbackError::Metadata(format!(
                "Failed to create snapshots directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a snapshot record durably
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), RollbackError> {
        let path = self
            .record_path(&snapshot.snapshot_id)
            .ok_or_else(|| RollbackError::Metadata(format!(
                "Invalid snapshot id: {}",
                snapshot.snapshot_id
            )))?;
        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| {
            RollbackError::Metadata(format!("Failed to serialize snapshot: {}", e))
        })?;
        atomic::write_atomic(&path, &json).map_err(|e| {
            RollbackError::Metadata(format!(
                "Failed to write snapshot record {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load a snapshot record; `None` when the id is unknown
    pub fn load(&self, snapshot_id: &str) -> Result<Option<Snapshot>, RollbackError> {
        let Some(path) = self.record_path(snapshot_id) else {
            return Ok(None);
        };
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RollbackError::Metadata(format!(
                    "Failed to read snapshot record {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        parse_record(&path, &bytes).map(Some)
    }

    /// Remove a snapshot record; `false` when the id is unknown
    pub fn delete(&self, snapshot_id: &str) -> Result<bool, RollbackError> {
        let Some(path) = self.record_path(snapshot_id) else {
            return Ok(false);
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                atomic::sync_dir(&self.dir);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RollbackError::Metadata(format!(
                "Failed to delete snapshot record {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Every persisted snapshot, in no particular order
    pub fn load_all(&self) -> Result<Vec<Snapshot>, RollbackError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            RollbackError::Metadata(format!(
                "Failed to read snapshots directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_record = path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION);
            let is_hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !is_record || is_hidden {
                continue;
            }
            let bytes = fs::read(&path)?;
            snapshots.push(parse_record(&path, &bytes)?);
        }
        Ok(snapshots)
    }

    /// Record path for an id; `None` for ids that could escape the directory
    fn record_path(&self, snapshot_id: &str) -> Option<PathBuf> {
        let valid = !snapshot_id.is_empty()
            && snapshot_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.dir.join(format!("{}.{}", snapshot_id, RECORD_EXTENSION)))
    }
}

fn parse_record(path: &Path, bytes: &[u8]) -> Result<Snapshot, RollbackError> {
    let snapshot: Snapshot = serde_json::from_slice(bytes).map_err(|e| {
        RollbackError::Metadata(format!(
            "Failed to parse snapshot record {}: {}",
            path.display(),
            e
        ))
    })?;
    if snapshot.version > SNAPSHOT_FORMAT_VERSION {
        return Err(RollbackError::Metadata(format!(
            "Unsupported snapshot format version {} in {}",
            snapshot.version,
            path.display()
        )));
    }
    Ok(snapshot)
}
