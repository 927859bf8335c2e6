//! Error types for the reclaim rollback core.

use crate::ledger::TransactionStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Content store errors
///
/// Any of these is fatal to the snapshot attempt that triggered it.
#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("Content store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Hash mismatch ({algorithm}): expected {expected}, got {actual}")]
    HashMismatch {
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("Not a blob locator: {0:?}")]
    InvalidLocator(PathBuf),

    #[error("Unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Source changed while it was being stored: {0:?}")]
    SourceChanged(PathBuf),
}

impl ContentStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ContentStoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Rollback-level errors surfaced by the snapshot manager, the ledger and the orchestrator
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("Content store error: {0}")]
    ContentStore(#[from] ContentStoreError),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Transaction {id} is {status} and cannot transition again")]
    TransactionState {
        id: String,
        status: TransactionStatus,
    },

    #[error("Restore of snapshot {snapshot_id} incomplete: {} file(s) failed", failed.len())]
    Restore {
        snapshot_id: String,
        failed: Vec<PathBuf>,
    },

    #[error("Snapshot {snapshot_id} failed verification: {} problem(s)", issues.len())]
    Integrity {
        snapshot_id: String,
        issues: Vec<String>,
    },

    #[error("Not a regular file: {0:?} (expand directories before snapshotting)")]
    NotAFile(PathBuf),

    #[error("Failed to capture {path:?}: {source}")]
    Capture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot metadata error: {0}")]
    Metadata(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Failed to acquire store lock at {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Nothing to undo: no committed transaction in the ledger")]
    NothingToUndo,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for RollbackError {
    fn from(err: sled::Error) -> Self {
        RollbackError::Ledger(err.to_string())
    }
}

impl From<config::ConfigError> for RollbackError {
    fn from(err: config::ConfigError) -> Self {
        RollbackError::Config(err.to_string())
    }
}
