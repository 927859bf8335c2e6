//! Snapshot manager: capture a set of files into a persisted snapshot, restore it, delete it
//!
//! File bytes live in the [`ContentStore`]; a snapshot only records which blob holds each
//! file. Capture is all-or-nothing (one unreadable file fails the whole snapshot and nothing
//! is persisted). Restore is per-file atomic and best-effort across files.

pub mod storage;
pub mod types;

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::atomic;
use crate::concurrency::StoreLock;
use crate::content::{ContentStore, HashAlgorithm};
use crate::error::{ContentStoreError, RollbackError};

pub use storage::SnapshotRecords;
pub use types::{
    BlobIssue, RestoreFailure, RestoreReport, Snapshot, SnapshotFile, SnapshotSummary,
    VerifyReport, SNAPSHOT_FORMAT_VERSION,
};

static SNAPSHOT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Integrity checks performed while restoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorePolicy {
    /// Re-hash each blob before copying it back
    pub verify_blobs: bool,
    /// Re-hash each restored file after the rename
    pub verify_restored: bool,
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self {
            verify_blobs: true,
            verify_restored: true,
        }
    }
}

pub struct SnapshotManager {
    base_dir: PathBuf,
    store: ContentStore,
    records: SnapshotRecords,
    policy: RestorePolicy,
}

impl SnapshotManager {
    /// Open the snapshot tree and blob store under `base_dir`
    pub fn new<P: AsRef<Path>>(
        base_dir: P,
        algorithm: HashAlgorithm,
        policy: RestorePolicy,
    ) -> Result<Self, RollbackError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        let store = ContentStore::new(&base_dir, algorithm)?;
        let records = SnapshotRecords::new(&base_dir)?;
        Ok(Self {
            base_dir,
            store,
            records,
            policy,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn content_store(&self) -> &ContentStore {
        &self.store
    }

    pub fn policy(&self) -> RestorePolicy {
        self.policy
    }

    /// Capture `paths` into a new persisted snapshot
    ///
    /// Every path must be a regular file; directories are expanded by the caller. Duplicate
    /// paths are captured once. Any failure aborts the whole call and no record is written.
    pub fn create_snapshot<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Snapshot, RollbackError> {
        let _lock = StoreLock::acquire(&self.base_dir)?;

        let mut seen = HashSet::new();
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let absolute = absolute_path(path.as_ref())?;
            if !seen.insert(absolute.clone()) {
                continue;
            }
            let file = self.capture_file(&absolute).map_err(|e| {
                warn!(path = %absolute.display(), error = %e, "Snapshot capture failed");
                e
            })?;
            files.push(file);
        }

        let snapshot = Snapshot {
            version: SNAPSHOT_FORMAT_VERSION,
            snapshot_id: new_snapshot_id(),
            created_at: Utc::now(),
            files,
        };
        self.records.save(&snapshot)?;
        info!(
            snapshot = %snapshot.snapshot_id,
            files = snapshot.files.len(),
            bytes = snapshot.total_bytes(),
            "Snapshot created"
        );
        Ok(snapshot)
    }

    /// Restore every file of a snapshot to its original path
    ///
    /// Unknown ids fail with `SnapshotNotFound`. Otherwise every file is attempted and the
    /// report lists which were restored and which failed.
    pub fn restore_snapshot(&self, snapshot_id: &str) -> Result<RestoreReport, RollbackError> {
        let _lock = StoreLock::acquire(&self.base_dir)?;
        let snapshot = self.load_snapshot(snapshot_id)?;

        let mut report = RestoreReport::new(snapshot_id);
        for file in &snapshot.files {
            match self.restore_file(file) {
                Ok(()) => {
                    debug!(path = %file.original_path.display(), "File restored");
                    report.restored.push(file.original_path.clone());
                }
                Err(e) => {
                    warn!(
                        snapshot = %snapshot_id,
                        path = %file.original_path.display(),
                        error = %e,
                        "File restore failed"
                    );
                    report.failed.push(RestoreFailure {
                        path: file.original_path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.is_complete() {
            info!(snapshot = %snapshot_id, files = report.restored.len(), "Snapshot restored");
        } else {
            warn!(
                snapshot = %snapshot_id,
                restored = report.restored.len(),
                failed = report.failed.len(),
                "Snapshot restore incomplete"
            );
        }
        Ok(report)
    }

    /// Delete a snapshot's metadata record; blobs are left in place
    pub fn delete_snapshot(&self, snapshot_id: &str) -> Result<bool, RollbackError> {
        let _lock = StoreLock::acquire(&self.base_dir)?;
        let deleted = self.records.delete(snapshot_id)?;
        if deleted {
            info!(snapshot = %snapshot_id, "Snapshot deleted");
        }
        Ok(deleted)
    }

    /// Snapshot summaries, most recent first
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>, RollbackError> {
        let mut snapshots = self.records.load_all()?;
        snapshots.sort_by(|a, b| {
            (b.created_at, &b.snapshot_id).cmp(&(a.created_at, &a.snapshot_id))
        });
        Ok(snapshots.iter().map(Snapshot::summary).collect())
    }

    pub fn load_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, RollbackError> {
        self.records
            .load(snapshot_id)?
            .ok_or_else(|| RollbackError::SnapshotNotFound(snapshot_id.to_string()))
    }

    /// Re-hash every blob a snapshot references
    pub fn verify_snapshot(&self, snapshot_id: &str) -> Result<VerifyReport, RollbackError> {
        let snapshot = self.load_snapshot(snapshot_id)?;
        let mut report = VerifyReport {
            snapshot_id: snapshot_id.to_string(),
            checked: 0,
            missing: Vec::new(),
            corrupt: Vec::new(),
        };

        for file in &snapshot.files {
            report.checked += 1;
            let issue = |reason: String| BlobIssue {
                original_path: file.original_path.clone(),
                backup_path: file.backup_path.clone(),
                algorithm: file.content_hash.algorithm.name().to_string(),
                reason,
            };
            if !file.backup_path.is_file() {
                report.missing.push(issue("blob missing".to_string()));
                continue;
            }
            match self.store.verify(&file.backup_path) {
                Ok(true) if self.store.locate(&file.backup_path)? == file.content_hash => {}
                Ok(true) => report
                    .corrupt
                    .push(issue("blob does not match recorded hash".to_string())),
                Ok(false) => report.corrupt.push(issue("hash mismatch".to_string())),
                Err(e) => report.corrupt.push(issue(e.to_string())),
            }
        }
        Ok(report)
    }

    fn capture_file(&self, path: &Path) -> Result<SnapshotFile, RollbackError> {
        let link_meta = fs::symlink_metadata(path).map_err(|source| RollbackError::Capture {
            path: path.to_path_buf(),
            source,
        })?;
        if !link_meta.file_type().is_file() {
            return Err(RollbackError::NotAFile(path.to_path_buf()));
        }

        let mut file = File::open(path).map_err(|source| RollbackError::Capture {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| RollbackError::Capture {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(RollbackError::NotAFile(path.to_path_buf()));
        }

        let stored = self.store.store_open_file(&mut file, path)?;
        if stored.size != metadata.len() {
            return Err(ContentStoreError::SourceChanged(path.to_path_buf()).into());
        }

        Ok(SnapshotFile {
            original_path: path.to_path_buf(),
            content_hash: stored.content_hash,
            backup_path: stored.backup_path,
            size: stored.size,
            mtime: metadata.modified().ok().map(DateTime::<Utc>::from),
            permissions: permission_bits(&metadata),
            captured_at: Utc::now(),
        })
    }

    fn restore_file(&self, file: &SnapshotFile) -> Result<(), RollbackError> {
        let target = &file.original_path;
        let parent = target
            .parent()
            .ok_or_else(|| RollbackError::NotAFile(target.clone()))?;
        fs::create_dir_all(parent)?;

        let mut reader = self
            .store
            .retrieve(&file.backup_path, self.policy.verify_blobs)?;
        let mut digest = file.content_hash.algorithm.hasher();
        let (temp_path, written) =
            atomic::spool_to_temp(parent, "restore", &mut reader, |chunk| digest.update(chunk))?;

        let finish = || -> Result<(), RollbackError> {
            let actual = digest.finalize_hex();
            if actual != file.content_hash.hex || written != file.size {
                return Err(ContentStoreError::HashMismatch {
                    algorithm: file.content_hash.algorithm.name().to_string(),
                    expected: file.content_hash.hex.clone(),
                    actual,
                }
                .into());
            }
            if let Some(mtime) = file.mtime {
                File::options()
                    .write(true)
                    .open(&temp_path)?
                    .set_modified(SystemTime::from(mtime))?;
            }
            apply_permissions(&temp_path, file.permissions)?;
            fs::rename(&temp_path, target)?;
            Ok(())
        };
        if let Err(e) = finish() {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        atomic::sync_dir(parent);

        if self.policy.verify_restored {
            let actual = file.content_hash.algorithm.hash_file(target)?;
            if actual != file.content_hash {
                return Err(ContentStoreError::HashMismatch {
                    algorithm: file.content_hash.algorithm.name().to_string(),
                    expected: file.content_hash.hex.clone(),
                    actual: actual.hex,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Absolute path with the parent canonicalized and the final component kept as given,
/// so a symlink at `path` is reported as such instead of being resolved to its target
fn absolute_path(path: &Path) -> Result<PathBuf, RollbackError> {
    let capture_err = |source| RollbackError::Capture {
        path: path.to_path_buf(),
        source,
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| RollbackError::NotAFile(path.to_path_buf()))?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir().map_err(capture_err)?,
    };
    let parent = dunce::canonicalize(&parent).map_err(capture_err)?;
    Ok(parent.join(file_name))
}

fn new_snapshot_id() -> String {
    let seq = SNAPSHOT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "snap-{}-{:06}-{}",
        Utc::now().timestamp_millis(),
        seq,
        &random[..8]
    )
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
fn apply_permissions(path: &Path, mode: Option<u32>) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _mode: Option<u32>) -> std::io::Result<()> {
    Ok(())
}
