//! Snapshot records and restore/verify reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::content::ContentHash;
use crate::error::RollbackError;

/// Current on-disk format of snapshot metadata records
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One captured file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Absolute path the file was captured from and will be restored to
    pub original_path: PathBuf,
    pub content_hash: ContentHash,
    /// Blob in the content store; may be shared with other snapshot files
    pub backup_path: PathBuf,
    pub size: u64,
    #[serde(default)]
    pub mtime: Option<DateTime<Utc>>,
    /// Unix mode bits, re-applied on restore
    #[serde(default)]
    pub permissions: Option<u32>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub snapshot_id: String,
    pub created_at: DateTime<Utc>,
    pub files: Vec<SnapshotFile>,
}

fn default_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

impl Snapshot {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            snapshot_id: self.snapshot_id.clone(),
            created_at: self.created_at,
            file_count: self.files.len(),
            total_bytes: self.total_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub snapshot_id: String,
    pub created_at: DateTime<Utc>,
    pub file_count: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a best-effort multi-file restore
///
/// Each file is restored atomically on its own; the snapshot as a whole is not. A failure on
/// one file never stops the remaining files from being attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub snapshot_id: String,
    pub restored: Vec<PathBuf>,
    pub failed: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn new(snapshot_id: impl Into<String>) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            restored: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_paths(&self) -> Vec<PathBuf> {
        self.failed.iter().map(|f| f.path.clone()).collect()
    }

    /// Convert an incomplete restore into `RollbackError::Restore`
    pub fn into_result(self) -> Result<RestoreReport, RollbackError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(RollbackError::Restore {
                failed: self.failed_paths(),
                snapshot_id: self.snapshot_id,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobIssue {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub algorithm: String,
    pub reason: String,
}

/// Integrity of the blobs a snapshot references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub snapshot_id: String,
    pub checked: usize,
    pub missing: Vec<BlobIssue>,
    pub corrupt: Vec<BlobIssue>,
}

impl VerifyReport {
    pub fn is_intact(&self) -> bool {
        self.missing.is_empty() && self.corrupt.is_empty()
    }
}
