//! Rollback orchestrator
//!
//! [`RollbackManager`] wraps a destructive operation in snapshot → begin → run → commit.
//! When the operation fails the transaction is marked rolled back in the ledger and the
//! snapshot is restored, then the operation's own error is handed back unchanged.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{RecoveryConfig, RollbackConfig};
use crate::error::RollbackError;
use crate::ledger::{TransactionLog, TransactionScope, TransactionSummary};
use crate::snapshot::{
    RestoreReport, Snapshot, SnapshotManager, SnapshotSummary, VerifyReport,
};

/// Ledger directory name under the base directory
pub const LEDGER_DIR: &str = "transactions";

/// What the automatic rollback of a failed operation achieved
#[derive(Debug)]
pub struct RollbackOutcome {
    pub snapshot_id: String,
    pub transaction_id: String,
    /// Result of marking the transaction ROLLED_BACK in the ledger
    pub ledger: Result<(), RollbackError>,
    /// Result of restoring the pre-operation snapshot
    pub restore: Result<RestoreReport, RollbackError>,
}

impl RollbackOutcome {
    /// Ledger updated and every file restored
    pub fn is_clean(&self) -> bool {
        self.ledger.is_ok() && matches!(&self.restore, Ok(report) if report.is_complete())
    }
}

/// Failure of a protected execution
#[derive(Debug)]
pub enum ProtectedError<E> {
    /// Snapshot or transaction could not be set up; the operation never ran
    Setup(RollbackError),
    /// The operation failed; `source` is its error, unchanged
    Operation { source: E, rollback: RollbackOutcome },
    /// The operation succeeded but the commit could not be recorded, so its effects were rolled back
    Commit {
        error: RollbackError,
        rollback: RollbackOutcome,
    },
}

impl<E> ProtectedError<E> {
    pub fn rollback(&self) -> Option<&RollbackOutcome> {
        match self {
            ProtectedError::Setup(_) => None,
            ProtectedError::Operation { rollback, .. } | ProtectedError::Commit { rollback, .. } => {
                Some(rollback)
            }
        }
    }

    /// The operation's own error, if the operation is what failed
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            ProtectedError::Operation { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ProtectedError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectedError::Setup(e) => write!(f, "Protection setup failed: {}", e),
            ProtectedError::Operation { source, rollback } => write!(
                f,
                "Operation failed and was rolled back{}: {}",
                if rollback.is_clean() { "" } else { " incompletely" },
                source
            ),
            ProtectedError::Commit { error, rollback } => write!(
                f,
                "Commit failed and the operation was rolled back{}: {}",
                if rollback.is_clean() { "" } else { " incompletely" },
                error
            ),
        }
    }
}

impl<E> std::error::Error for ProtectedError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtectedError::Setup(e) => Some(e),
            ProtectedError::Operation { source, .. } => Some(source),
            ProtectedError::Commit { error, .. } => Some(error),
        }
    }
}

/// Result of the undo that also restores files
#[derive(Debug)]
pub struct UndoOutcome {
    pub transaction_id: String,
    /// Snapshot restored, `None` when the transaction had no linked snapshot
    pub restore: Option<RestoreReport>,
}

pub struct RollbackManager {
    snapshots: SnapshotManager,
    ledger: TransactionLog,
    recovery: RecoveryConfig,
}

impl RollbackManager {
    pub fn new(snapshots: SnapshotManager, ledger: TransactionLog, recovery: RecoveryConfig) -> Self {
        Self {
            snapshots,
            ledger,
            recovery,
        }
    }

    /// Open snapshot store and ledger under `base_dir` using `config`
    pub fn open(base_dir: &Path, config: &RollbackConfig) -> Result<Self, RollbackError> {
        let snapshots = SnapshotManager::new(
            base_dir,
            config.storage.hash_algorithm,
            config.restore.policy(),
        )?;
        let ledger = TransactionLog::open(base_dir.join(LEDGER_DIR))?;
        info!(base_dir = %base_dir.display(), "Rollback manager opened");
        Ok(Self::new(snapshots, ledger, config.recovery.clone()))
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    pub fn ledger(&self) -> &TransactionLog {
        &self.ledger
    }

    /// Run `operation` with `paths` protected
    ///
    /// Either the operation succeeds and its transaction is COMMITTED, or every file in
    /// `paths` is restored to its pre-operation content and the error is returned.
    pub fn execute_with_protection<T, E, F, P>(
        &self,
        paths: &[P],
        operation: F,
    ) -> Result<T, ProtectedError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        P: AsRef<Path>,
    {
        self.execute_recorded(paths, |_scope| operation())
    }

    /// Like [`execute_with_protection`](Self::execute_with_protection), handing the operation a
    /// scope to record what it does
    pub fn execute_recorded<T, E, F, P>(
        &self,
        paths: &[P],
        operation: F,
    ) -> Result<T, ProtectedError<E>>
    where
        F: FnOnce(&TransactionScope<'_>) -> Result<T, E>,
        P: AsRef<Path>,
    {
        let snapshot = self
            .snapshots
            .create_snapshot(paths)
            .map_err(ProtectedError::Setup)?;
        let transaction_id = self
            .ledger
            .begin_for_snapshot(&snapshot.snapshot_id)
            .map_err(ProtectedError::Setup)?;

        let scope = TransactionScope::new(
            &self.ledger,
            transaction_id.clone(),
            Some(snapshot.snapshot_id.clone()),
        );
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| operation(&scope))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                error!(transaction = %transaction_id, "Protected operation panicked; rolling back");
                self.roll_back(&snapshot, &transaction_id);
                panic::resume_unwind(payload);
            }
        };
        match outcome {
            Ok(value) => match self.ledger.commit_transaction(&transaction_id) {
                Ok(()) => Ok(value),
                Err(commit_error) => {
                    error!(
                        transaction = %transaction_id,
                        error = %commit_error,
                        "Commit failed; rolling back"
                    );
                    let rollback = self.roll_back(&snapshot, &transaction_id);
                    Err(ProtectedError::Commit {
                        error: commit_error,
                        rollback,
                    })
                }
            },
            Err(source) => {
                warn!(transaction = %transaction_id, "Protected operation failed; rolling back");
                let rollback = self.roll_back(&snapshot, &transaction_id);
                Err(ProtectedError::Operation { source, rollback })
            }
        }
    }

    /// Ledger first, then files; a ledger failure does not stop the restore
    fn roll_back(&self, snapshot: &Snapshot, transaction_id: &str) -> RollbackOutcome {
        let ledger = self.ledger.rollback_transaction(transaction_id);
        if let Err(e) = &ledger {
            error!(transaction = %transaction_id, error = %e, "Failed to mark transaction rolled back");
        }
        let restore = self.snapshots.restore_snapshot(&snapshot.snapshot_id);
        match &restore {
            Ok(report) if report.is_complete() => {}
            Ok(report) => error!(
                snapshot = %snapshot.snapshot_id,
                failed = report.failed.len(),
                "Rollback restore incomplete"
            ),
            Err(e) => error!(snapshot = %snapshot.snapshot_id, error = %e, "Rollback restore failed"),
        }
        RollbackOutcome {
            snapshot_id: snapshot.snapshot_id.clone(),
            transaction_id: transaction_id.to_string(),
            ledger,
            restore,
        }
    }

    /// Restore a snapshot by id
    pub fn restore_to_snapshot(&self, snapshot_id: &str) -> Result<RestoreReport, RollbackError> {
        self.snapshots.restore_snapshot(snapshot_id)
    }

    /// Mark the most recent COMMITTED transaction ROLLED_BACK; files are not touched
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo_last_operation(&self) -> Result<bool, RollbackError> {
        match self.ledger.last_committed()? {
            Some(transaction) => {
                self.ledger.mark_undone(&transaction.transaction_id)?;
                Ok(true)
            }
            None => {
                info!("Nothing to undo");
                Ok(false)
            }
        }
    }

    /// Mark the most recent COMMITTED transaction ROLLED_BACK and restore its snapshot
    pub fn undo_last_operation_with_restore(&self) -> Result<Option<UndoOutcome>, RollbackError> {
        let Some(transaction) = self.ledger.last_committed()? else {
            info!("Nothing to undo");
            return Ok(None);
        };
        // A deleted snapshot must fail the undo before the ledger changes
        let snapshot = match &transaction.snapshot_id {
            Some(snapshot_id) => Some(self.snapshots.load_snapshot(snapshot_id)?),
            None => None,
        };
        self.ledger.mark_undone(&transaction.transaction_id)?;

        let restore = match snapshot {
            Some(snapshot) => Some(self.snapshots.restore_snapshot(&snapshot.snapshot_id)?),
            None => {
                warn!(
                    transaction = %transaction.transaction_id,
                    "Undone transaction has no linked snapshot; files left as they are"
                );
                None
            }
        };
        Ok(Some(UndoOutcome {
            transaction_id: transaction.transaction_id,
            restore,
        }))
    }

    pub fn create_snapshot<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Snapshot, RollbackError> {
        self.snapshots.create_snapshot(paths)
    }

    pub fn delete_snapshot(&self, snapshot_id: &str) -> Result<bool, RollbackError> {
        self.snapshots.delete_snapshot(snapshot_id)
    }

    pub fn load_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, RollbackError> {
        self.snapshots.load_snapshot(snapshot_id)
    }

    pub fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>, RollbackError> {
        self.snapshots.list_snapshots()
    }

    pub fn list_transactions(&self) -> Result<Vec<TransactionSummary>, RollbackError> {
        self.ledger.list_transactions()
    }

    /// PENDING transactions older than the configured orphan threshold
    pub fn pending_transactions(&self) -> Result<Vec<TransactionSummary>, RollbackError> {
        self.ledger
            .pending_older_than(self.recovery.orphan_after(), Utc::now())
    }

    pub fn verify_snapshot(&self, snapshot_id: &str) -> Result<VerifyReport, RollbackError> {
        self.snapshots.verify_snapshot(snapshot_id)
    }
}
