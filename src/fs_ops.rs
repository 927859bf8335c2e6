//! Recorded filesystem operations
//!
//! Each helper appends its [`Operation`](crate::ledger::Operation) to the open transaction
//! before touching the filesystem, so the ledger never misses an operation that ran.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::atomic;
use crate::error::RollbackError;
use crate::ledger::{OperationKind, TransactionScope};

/// Move `source` to `dest`, falling back to copy + delete when a rename is not possible
pub fn move_file(scope: &TransactionScope<'_>, source: &Path, dest: &Path) -> Result<(), RollbackError> {
    scope.record(OperationKind::Move, source, Some(dest))?;
    if let Err(rename_err) = fs::rename(source, dest) {
        debug!(
            source = %source.display(),
            dest = %dest.display(),
            error = %rename_err,
            "Rename failed; copying instead"
        );
        fs::copy(source, dest)?;
        fs::remove_file(source)?;
    }
    Ok(())
}

pub fn delete_file(scope: &TransactionScope<'_>, path: &Path) -> Result<(), RollbackError> {
    scope.record(OperationKind::Delete, path, None)?;
    fs::remove_file(path)?;
    Ok(())
}

pub fn copy_file(scope: &TransactionScope<'_>, source: &Path, dest: &Path) -> Result<u64, RollbackError> {
    scope.record(OperationKind::Copy, source, Some(dest))?;
    Ok(fs::copy(source, dest)?)
}

/// Replace `link` with a symlink pointing at `target`
///
/// Recorded with `link` as the source path (the file being replaced) and `target` as the
/// destination.
pub fn symlink_file(scope: &TransactionScope<'_>, target: &Path, link: &Path) -> Result<(), RollbackError> {
    scope.record(OperationKind::Symlink, link, Some(target))?;
    match fs::symlink_metadata(link) {
        Ok(_) => fs::remove_file(link)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    make_symlink(target, link)?;
    Ok(())
}

/// Create (or replace) `path` with `contents`, atomically
pub fn create_file(scope: &TransactionScope<'_>, path: &Path, contents: &[u8]) -> Result<(), RollbackError> {
    scope.record(OperationKind::Create, path, None)?;
    atomic::write_atomic(path, contents)?;
    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
